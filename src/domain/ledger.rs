use std::collections::HashMap;

use serde::Serialize;

use super::{Account, AccountId, Cents, TransactionRecord};

/// Rebuild a balance from an account's history.
///
/// Every account starts at zero and every balance change is logged, so the
/// sum of the signed amounts must equal the stored balance.
pub fn replay_balance(records: &[TransactionRecord]) -> Cents {
    records.iter().map(|r| r.amount_cents).sum()
}

/// An account whose stored balance disagrees with its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceMismatch {
    pub account_id: AccountId,
    pub username: String,
    pub stored: Cents,
    pub logged: Cents,
}

impl BalanceMismatch {
    pub fn difference(&self) -> Cents {
        self.stored - self.logged
    }
}

impl std::fmt::Display for BalanceMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: stored balance {} cents, history sums to {} cents",
            self.username, self.stored, self.logged
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub account_count: usize,
    pub transaction_count: i64,
    /// Sum of all stored balances.
    pub total_balance: Cents,
    pub mismatches: Vec<BalanceMismatch>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Compare stored balances with the per-account totals of the log.
/// Accounts missing from `logged_totals` have no history and should be at zero.
pub fn build_integrity_report(
    accounts: &[Account],
    logged_totals: &HashMap<AccountId, Cents>,
    transaction_count: i64,
) -> IntegrityReport {
    let mismatches = accounts
        .iter()
        .filter_map(|account| {
            let logged = logged_totals.get(&account.id).copied().unwrap_or(0);
            (logged != account.balance).then(|| BalanceMismatch {
                account_id: account.id,
                username: account.username.clone(),
                stored: account.balance,
                logged,
            })
        })
        .collect();

    IntegrityReport {
        account_count: accounts.len(),
        transaction_count,
        total_balance: accounts.iter().map(|a| a.balance).sum(),
        mismatches,
    }
}
