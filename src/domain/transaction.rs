use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Cents};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionKind {
    /// Name as stored in the `transaction_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "Deposit",
            TransactionKind::Withdrawal => "Withdrawal",
            TransactionKind::Transfer => "Transfer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Deposit" => Some(TransactionKind::Deposit),
            "Withdrawal" => Some(TransactionKind::Withdrawal),
            "Transfer" => Some(TransactionKind::Transfer),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A balance change that has not been written yet.
///
/// The store assigns the timestamp and sequence when it appends the entry,
/// turning it into a [`TransactionRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub kind: TransactionKind,
    /// Signed: positive when money enters the account.
    pub amount_cents: Cents,
}

impl NewTransaction {
    pub fn deposit(account_id: AccountId, amount_cents: Cents) -> Self {
        Self {
            account_id,
            kind: TransactionKind::Deposit,
            amount_cents,
        }
    }

    pub fn withdrawal(account_id: AccountId, amount_cents: Cents) -> Self {
        Self {
            account_id,
            kind: TransactionKind::Withdrawal,
            amount_cents: -amount_cents,
        }
    }

    /// The sender's side of a transfer.
    pub fn transfer_out(account_id: AccountId, amount_cents: Cents) -> Self {
        Self {
            account_id,
            kind: TransactionKind::Transfer,
            amount_cents: -amount_cents,
        }
    }

    /// The recipient's side of a transfer.
    pub fn transfer_in(account_id: AccountId, amount_cents: Cents) -> Self {
        Self {
            account_id,
            kind: TransactionKind::Transfer,
            amount_cents,
        }
    }
}

/// An immutable, already persisted entry of an account's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Monotonically increasing write order, breaks timestamp ties.
    pub sequence: i64,
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount_cents: Cents,
    pub timestamp: DateTime<Utc>,
}
