use tracing::{debug, info, warn};

use crate::domain::{
    Account, Cents, IntegrityReport, NewTransaction, TransactionRecord, build_integrity_report,
    format_cents, replay_balance,
};
use crate::storage::AccountStore;

use super::AppError;

/// Balance-changing operations and history.
///
/// Every operation that moves money runs inside one store transaction: the
/// balance updates and their log entries are committed together or not at all.
pub struct LedgerService {
    store: AccountStore,
}

/// Result of a completed transfer
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    /// The sender as it stands after the transfer
    pub sender: Account,
    pub recipient_username: String,
    pub amount_cents: Cents,
    /// The sender's record (negative amount)
    pub debit: TransactionRecord,
    /// The recipient's record (positive amount)
    pub credit: TransactionRecord,
}

impl LedgerService {
    pub fn new(store: AccountStore) -> Self {
        Self { store }
    }

    /// Add money to an account.
    pub async fn deposit(&self, account: &Account, amount_cents: Cents) -> Result<Account, AppError> {
        validate_amount(amount_cents)?;
        self.apply(account, NewTransaction::deposit(account.id, amount_cents))
            .await
    }

    /// Take money out of an account. The balance is allowed to go negative.
    pub async fn withdraw(
        &self,
        account: &Account,
        amount_cents: Cents,
    ) -> Result<Account, AppError> {
        validate_amount(amount_cents)?;
        let updated = self
            .apply(account, NewTransaction::withdrawal(account.id, amount_cents))
            .await?;
        if updated.is_overdrawn() {
            debug!(account_id = %updated.id, balance = updated.balance, "account overdrawn");
        }
        Ok(updated)
    }

    async fn apply(&self, account: &Account, entry: NewTransaction) -> Result<Account, AppError> {
        let mut tx = self.store.begin().await?;
        let balance = tx.adjust_balance(account.id, entry.amount_cents).await?;
        tx.append_transaction(&entry).await?;
        tx.commit().await?;

        info!(
            account_id = %account.id,
            kind = %entry.kind,
            amount = %format_cents(entry.amount_cents),
            "applied transaction"
        );

        Ok(Account {
            balance,
            ..account.clone()
        })
    }

    /// Move `amount_cents` from `sender` to the account named `recipient_username`.
    ///
    /// The debit, the credit and both log entries share one store transaction.
    /// If any of them fails the transaction is dropped, which rolls back the
    /// steps already taken.
    pub async fn transfer(
        &self,
        sender: &Account,
        recipient_username: &str,
        amount_cents: Cents,
    ) -> Result<TransferReceipt, AppError> {
        validate_amount(amount_cents)?;

        // Usernames never change and accounts are never deleted, so resolving
        // the recipient before the transaction cannot go stale.
        let Some(recipient) = self.store.find_by_username(recipient_username).await? else {
            warn!(
                sender = %sender.id,
                recipient_username,
                "transfer rejected: recipient not found"
            );
            return Err(AppError::RecipientNotFound(recipient_username.to_string()));
        };
        if recipient.id == sender.id {
            return Err(AppError::SelfTransfer);
        }

        let (sender_balance, debit, credit) = self
            .move_funds(sender, &recipient, amount_cents)
            .await
            .inspect_err(|err| {
                warn!(
                    sender = %sender.id,
                    recipient = %recipient.id,
                    error = %err,
                    "transfer rolled back"
                )
            })?;

        info!(
            sender = %sender.id,
            recipient = %recipient.id,
            amount = %format_cents(amount_cents),
            "transfer committed"
        );

        Ok(TransferReceipt {
            sender: Account {
                balance: sender_balance,
                ..sender.clone()
            },
            recipient_username: recipient.username,
            amount_cents,
            debit,
            credit,
        })
    }

    async fn move_funds(
        &self,
        sender: &Account,
        recipient: &Account,
        amount_cents: Cents,
    ) -> Result<(Cents, TransactionRecord, TransactionRecord), AppError> {
        let mut tx = self.store.begin().await?;
        let sender_balance = tx.adjust_balance(sender.id, -amount_cents).await?;
        tx.adjust_balance(recipient.id, amount_cents).await?;
        let debit = tx
            .append_transaction(&NewTransaction::transfer_out(sender.id, amount_cents))
            .await?;
        let credit = tx
            .append_transaction(&NewTransaction::transfer_in(recipient.id, amount_cents))
            .await?;
        tx.commit().await?;
        Ok((sender_balance, debit, credit))
    }

    /// All of an account's records, oldest first.
    pub async fn history(&self, account: &Account) -> Result<Vec<TransactionRecord>, AppError> {
        Ok(self.store.list_transactions(account.id).await?)
    }

    /// Re-read an account to pick up its current balance.
    pub async fn balance(&self, account: &Account) -> Result<Account, AppError> {
        self.store
            .find_by_id(account.id)
            .await?
            .ok_or(AppError::AccountNotFound(account.id))
    }

    // ========================
    // Integrity operations
    // ========================

    /// Compare every stored balance with the sum of its history.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let accounts = self.store.list_accounts().await?;
        let totals = self.store.logged_totals().await?;
        let transaction_count = self.store.count_transactions().await?;

        let report = build_integrity_report(&accounts, &totals, transaction_count);
        for mismatch in &report.mismatches {
            warn!(%mismatch, "balance does not match history");
        }
        Ok(report)
    }

    /// Reset an account's balance to the sum of its history.
    pub async fn reconcile(&self, account: &Account) -> Result<Account, AppError> {
        let mut tx = self.store.begin().await?;
        // A zero adjustment takes the write lock before the history is read.
        let stored = tx.adjust_balance(account.id, 0).await?;
        let records = tx.list_transactions(account.id).await?;
        let balance = replay_balance(&records);

        if balance != stored {
            tx.update_balance(account.id, balance).await?;
            info!(
                account_id = %account.id,
                from = %format_cents(stored),
                to = %format_cents(balance),
                "reconciled balance"
            );
        }
        tx.commit().await?;

        Ok(Account {
            balance,
            ..account.clone()
        })
    }
}

fn validate_amount(amount_cents: Cents) -> Result<(), AppError> {
    if amount_cents <= 0 {
        return Err(AppError::InvalidAmount(format!(
            "{} (must be positive)",
            format_cents(amount_cents)
        )));
    }
    Ok(())
}
