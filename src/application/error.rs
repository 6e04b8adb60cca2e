use thiserror::Error;

use crate::domain::{AccountId, RegistrationError};
use crate::storage::{AccountMissing, DuplicateUsername};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid registration: {0}")]
    InvalidRegistration(#[from] RegistrationError),

    #[error("Cannot transfer to the same account")]
    SelfTransfer,

    #[error("Password hashing failed: {0}")]
    PasswordHashing(#[from] bcrypt::BcryptError),

    #[error("Storage unavailable: {0:#}")]
    StorageUnavailable(anyhow::Error),
}

/// Storage errors carrying a typed cause become the matching variant;
/// anything else is reported as the store being unavailable.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(DuplicateUsername(username)) = err.downcast_ref::<DuplicateUsername>() {
            return AppError::UsernameTaken(username.clone());
        }
        if let Some(AccountMissing(id)) = err.downcast_ref::<AccountMissing>() {
            return AppError::AccountNotFound(*id);
        }
        AppError::StorageUnavailable(err)
    }
}
