use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::{Executor, Row, Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, Cents, NewTransaction, PasswordHash, TransactionKind, TransactionRecord,
};

use super::MIGRATION_001_INITIAL;

/// Raised by [`AccountStore::insert`] when the username is already registered.
#[derive(Debug, Error)]
#[error("username already exists: {0}")]
pub struct DuplicateUsername(pub String);

/// Raised when a balance write targets an account id that is not stored.
#[derive(Debug, Error)]
#[error("account not found: {0}")]
pub struct AccountMissing(pub AccountId);

/// Persistent accounts and their transaction log, backed by SQLite.
///
/// Cloning is cheap: clones share the same connection pool.
#[derive(Clone)]
pub struct AccountStore {
    pool: SqlitePool,
}

impl AccountStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Connect and migrate.
    pub async fn init(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a transactional unit. Dropping it without [`StoreTransaction::commit`]
    /// rolls back everything written through it.
    pub async fn begin(&self) -> Result<StoreTransaction> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(StoreTransaction { tx })
    }

    // ========================
    // Account operations
    // ========================

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password, current_balance, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by username")?;

        row.as_ref().map(row_to_account).transpose()
    }

    pub async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        select_account(&self.pool, id).await
    }

    /// Register a new account with a zero balance.
    ///
    /// Uniqueness is enforced by the `UNIQUE` constraint on `users.username`, so
    /// two concurrent inserts of the same name cannot both succeed.
    pub async fn insert(&self, username: &str, password_hash: PasswordHash) -> Result<Account> {
        let account = Account::new(username.to_string(), password_hash);

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, password, current_balance, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.username)
        .bind(account.password_hash.as_str())
        .bind(account.balance)
        .bind(format_timestamp(account.created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(account),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(DuplicateUsername(account.username).into())
            }
            Err(err) => Err(anyhow::Error::new(err).context("Failed to insert account")),
        }
    }

    /// All accounts, ordered by username.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, password, current_balance, created_at
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(row_to_account).collect()
    }

    /// Overwrite an account's balance outside of any transaction.
    pub async fn update_balance(&self, id: AccountId, new_balance: Cents) -> Result<()> {
        write_balance(&self.pool, id, new_balance).await
    }

    // ========================
    // Transaction log operations
    // ========================

    /// Append one entry to the log. Timestamp and sequence are assigned here.
    pub async fn append_transaction(&self, entry: &NewTransaction) -> Result<TransactionRecord> {
        insert_transaction(&self.pool, entry).await
    }

    /// An account's history, oldest first.
    pub async fn list_transactions(&self, account_id: AccountId) -> Result<Vec<TransactionRecord>> {
        select_transactions(&self.pool, account_id).await
    }

    /// Sum of logged amounts per account. Accounts without history are absent.
    pub async fn logged_totals(&self) -> Result<HashMap<AccountId, Cents>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, SUM(transaction_amount) as total
            FROM transactions
            GROUP BY user_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to sum transactions")?;

        let mut totals = HashMap::new();
        for row in rows {
            let id_str: String = row.try_get("user_id")?;
            let id = Uuid::parse_str(&id_str).context("Invalid account ID")?;
            totals.insert(id, row.try_get("total")?);
        }
        Ok(totals)
    }

    pub async fn count_transactions(&self) -> Result<i64> {
        let count = sqlx::query("SELECT COUNT(*) as count FROM transactions")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count transactions")?
            .try_get("count")?;
        Ok(count)
    }
}

/// A single SQLite transaction over the account store.
pub struct StoreTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl StoreTransaction {
    pub async fn find_by_id(&mut self, id: AccountId) -> Result<Option<Account>> {
        select_account(&mut *self.tx, id).await
    }

    /// Add `delta` to the balance in one statement and return the new balance.
    ///
    /// Being a single relative update, it cannot lose a concurrent change
    /// to the same account.
    pub async fn adjust_balance(&mut self, id: AccountId, delta: Cents) -> Result<Cents> {
        let row = sqlx::query(
            r#"
            UPDATE users
            SET current_balance = current_balance + ?
            WHERE id = ?
            RETURNING current_balance
            "#,
        )
        .bind(delta)
        .bind(id.to_string())
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to adjust balance")?;

        match row {
            Some(row) => Ok(row.try_get("current_balance")?),
            None => Err(AccountMissing(id).into()),
        }
    }

    pub async fn update_balance(&mut self, id: AccountId, new_balance: Cents) -> Result<()> {
        write_balance(&mut *self.tx, id, new_balance).await
    }

    pub async fn append_transaction(&mut self, entry: &NewTransaction) -> Result<TransactionRecord> {
        insert_transaction(&mut *self.tx, entry).await
    }

    pub async fn list_transactions(&mut self, account_id: AccountId) -> Result<Vec<TransactionRecord>> {
        select_transactions(&mut *self.tx, account_id).await
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("Failed to commit transaction")
    }
}

async fn select_account<'e, E>(executor: E, id: AccountId) -> Result<Option<Account>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT id, username, password, current_balance, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(executor)
    .await
    .context("Failed to fetch account")?;

    row.as_ref().map(row_to_account).transpose()
}

async fn select_transactions<'e, E>(executor: E, account_id: AccountId) -> Result<Vec<TransactionRecord>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, transaction_type, transaction_amount, transaction_date
        FROM transactions
        WHERE user_id = ?
        ORDER BY transaction_date, id
        "#,
    )
    .bind(account_id.to_string())
    .fetch_all(executor)
    .await
    .context("Failed to list transactions")?;

    rows.iter().map(row_to_record).collect()
}

async fn write_balance<'e, E>(executor: E, id: AccountId, new_balance: Cents) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE users SET current_balance = ? WHERE id = ?")
        .bind(new_balance)
        .bind(id.to_string())
        .execute(executor)
        .await
        .context("Failed to update balance")?;

    if result.rows_affected() == 0 {
        return Err(AccountMissing(id).into());
    }
    Ok(())
}

async fn insert_transaction<'e, E>(executor: E, entry: &NewTransaction) -> Result<TransactionRecord>
where
    E: Executor<'e, Database = Sqlite>,
{
    // Stored with microsecond precision, so keep the in-memory copy identical.
    let timestamp = Utc::now().trunc_subsecs(6);

    let row = sqlx::query(
        r#"
        INSERT INTO transactions (user_id, transaction_type, transaction_amount, transaction_date)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(entry.account_id.to_string())
    .bind(entry.kind.as_str())
    .bind(entry.amount_cents)
    .bind(format_timestamp(timestamp))
    .fetch_one(executor)
    .await
    .context("Failed to append transaction")?;

    Ok(TransactionRecord {
        sequence: row.try_get("id")?,
        account_id: entry.account_id,
        kind: entry.kind,
        amount_cents: entry.amount_cents,
        timestamp,
    })
}

/// Fixed-width RFC 3339 so that text order in SQLite is time order.
fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid timestamp: {}", value))?
        .with_timezone(&Utc))
}

fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
    let id_str: String = row.try_get("id")?;
    let password: String = row.try_get("password")?;
    let created_at_str: String = row.try_get("created_at")?;

    Ok(Account {
        id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
        username: row.try_get("username")?,
        password_hash: PasswordHash::new_unchecked(&password),
        balance: row.try_get("current_balance")?,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<TransactionRecord> {
    let account_str: String = row.try_get("user_id")?;
    let kind_str: String = row.try_get("transaction_type")?;
    let date_str: String = row.try_get("transaction_date")?;

    Ok(TransactionRecord {
        sequence: row.try_get("id")?,
        account_id: Uuid::parse_str(&account_str).context("Invalid account ID")?,
        kind: TransactionKind::from_str(&kind_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", kind_str))?,
        amount_cents: row.try_get("transaction_amount")?,
        timestamp: parse_timestamp(&date_str)?,
    })
}
