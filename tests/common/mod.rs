// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use tellerbook::application::Bank;
use tellerbook::config::Config;
use tellerbook::domain::{Account, Cents, parse_cents};
use tellerbook::storage::AccountStore;
use tempfile::TempDir;

/// Lowest bcrypt cost, keeps registration fast in tests
pub const TEST_BCRYPT_COST: u32 = 4;

pub fn test_config(temp_dir: &TempDir) -> Config {
    Config {
        bcrypt_cost: TEST_BCRYPT_COST,
        ..Config::default()
    }
    .with_database_path(temp_dir.path().join("test.db"))
}

/// Helper to create both services on a temporary database.
/// The store is returned as well so tests can reach the raw tables.
pub async fn test_bank() -> Result<(Bank, AccountStore, TempDir)> {
    let temp_dir = TempDir::new()?;
    let config = test_config(&temp_dir);
    let store = AccountStore::init(&config.database_url()).await?;
    let bank = Bank::new(store.clone(), &config);
    Ok((bank, store, temp_dir))
}

/// Helper to turn a decimal string into cents
pub fn cents(amount: &str) -> Cents {
    parse_cents(amount).unwrap()
}

/// Test fixture: two registered users, alice1 and bob12
pub struct StandardAccounts {
    pub alice: Account,
    pub bob: Account,
}

impl StandardAccounts {
    pub const PASSWORD: &'static str = "pw";

    /// Register "alice1" and "bob12", both with a zero balance
    pub async fn create(bank: &Bank) -> Result<Self> {
        let alice = bank.auth.register("alice1", Self::PASSWORD).await?;
        let bob = bank.auth.register("bob12", Self::PASSWORD).await?;
        Ok(Self { alice, bob })
    }

    /// Register both users and give alice an opening deposit
    pub async fn create_funded(bank: &Bank, alice_deposit: Cents) -> Result<Self> {
        let mut accounts = Self::create(bank).await?;
        accounts.alice = bank.ledger.deposit(&accounts.alice, alice_deposit).await?;
        Ok(accounts)
    }
}

/// Current stored balance of an account
pub async fn balance_of(bank: &Bank, account: &Account) -> Result<Cents> {
    Ok(bank.ledger.balance(account).await?.balance)
}
