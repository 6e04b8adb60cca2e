//! Username rules and salted password hashes.
//!
//! Passwords never reach storage in plain text: registration turns them into
//! a bcrypt [`PasswordHash`] and login checks a candidate against it.

use bcrypt::{BcryptError, non_truncating_hash, non_truncating_verify};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest username accepted at registration.
pub const MAX_USERNAME_LENGTH: usize = 64;

/// Longest password bcrypt can hash without cutting it short: its 72-byte
/// input includes a terminating NUL.
pub const MAX_PASSWORD_BYTES: usize = 71;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("username must not be empty")]
    EmptyUsername,

    #[error("username must not start or end with whitespace")]
    PaddedUsername,

    #[error("username must be at least {0} characters")]
    UsernameTooShort(usize),

    #[error("username must be at most {} characters", MAX_USERNAME_LENGTH)]
    UsernameTooLong,

    #[error("password must not be empty")]
    EmptyPassword,

    #[error("password must be at most {} bytes", MAX_PASSWORD_BYTES)]
    PasswordTooLong,

    #[error("passwords do not match")]
    PasswordMismatch,
}

/// Check a username and password against the registration rules.
pub fn validate_registration(
    username: &str,
    password: &str,
    min_username_length: usize,
) -> Result<(), RegistrationError> {
    if username.is_empty() {
        return Err(RegistrationError::EmptyUsername);
    }
    if username.trim() != username {
        return Err(RegistrationError::PaddedUsername);
    }

    let length = username.chars().count();
    if length < min_username_length {
        return Err(RegistrationError::UsernameTooShort(min_username_length));
    }
    if length > MAX_USERNAME_LENGTH {
        return Err(RegistrationError::UsernameTooLong);
    }

    if password.is_empty() {
        return Err(RegistrationError::EmptyPassword);
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(RegistrationError::PasswordTooLong);
    }

    Ok(())
}

/// A salted and hashed password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Hash `raw_password` with a fresh salt.
    ///
    /// `cost` sets the number of bcrypt rounds; 4 is the minimum and only
    /// suitable for tests. Passwords longer than [`MAX_PASSWORD_BYTES`] are
    /// an error rather than being cut short.
    pub fn from_raw_password(raw_password: &str, cost: u32) -> Result<Self, BcryptError> {
        non_truncating_hash(raw_password, cost).map(Self)
    }

    /// Wrap a hash loaded from storage without checking its format.
    pub fn new_unchecked(raw_hash: &str) -> Self {
        Self(raw_hash.to_string())
    }

    /// Check `raw_password` against this hash.
    ///
    /// A password too long to have been hashed never matches.
    pub fn verify(&self, raw_password: &str) -> Result<bool, BcryptError> {
        if raw_password.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        non_truncating_verify(raw_password, &self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
