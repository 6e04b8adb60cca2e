use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{Cents, PasswordHash};

pub type AccountId = Uuid;

/// A registered user together with their current balance.
///
/// The username is fixed once the account exists. The balance is only ever
/// changed by the ledger service, which logs a [`super::TransactionRecord`]
/// for every change.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: PasswordHash,
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// A freshly registered account with a zero balance.
    pub fn new(username: String, password_hash: PasswordHash) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            balance: 0,
            created_at: Utc::now(),
        }
    }

    pub fn is_overdrawn(&self) -> bool {
        self.balance < 0
    }
}
