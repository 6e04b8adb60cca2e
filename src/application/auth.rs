use tracing::{info, warn};

use crate::domain::{Account, PasswordHash, RegistrationError, validate_registration};
use crate::storage::AccountStore;

use super::AppError;

/// Registration and login.
pub struct AuthService {
    store: AccountStore,
    bcrypt_cost: u32,
    min_username_length: usize,
}

impl AuthService {
    pub fn new(store: AccountStore) -> Self {
        Self {
            store,
            bcrypt_cost: PasswordHash::DEFAULT_COST,
            min_username_length: 1,
        }
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn with_min_username_length(mut self, length: usize) -> Self {
        self.min_username_length = length;
        self
    }

    /// Return the account if `password` matches the stored hash.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable to the caller.
    pub async fn login(&self, username: &str, password: &str) -> Result<Account, AppError> {
        let Some(account) = self.store.find_by_username(username).await? else {
            warn!(username, "login failed: unknown username");
            return Err(AppError::InvalidCredentials);
        };

        if !account.password_hash.verify(password)? {
            warn!(username, "login failed: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        info!(username, account_id = %account.id, "login succeeded");
        Ok(account)
    }

    /// Create an account with a zero balance.
    pub async fn register(&self, username: &str, password: &str) -> Result<Account, AppError> {
        validate_registration(username, password, self.min_username_length)?;

        let password_hash = PasswordHash::from_raw_password(password, self.bcrypt_cost)?;
        let account = self
            .store
            .insert(username, password_hash)
            .await
            .map_err(AppError::from)
            .inspect_err(|err| {
                if matches!(err, AppError::UsernameTaken(_)) {
                    warn!(username, "registration rejected: username taken");
                }
            })?;

        info!(username, account_id = %account.id, "registered account");
        Ok(account)
    }

    /// Like [`AuthService::register`], but the password has to be typed twice.
    pub async fn register_confirmed(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Account, AppError> {
        if password != confirm_password {
            return Err(RegistrationError::PasswordMismatch.into());
        }
        self.register(username, password).await
    }
}
