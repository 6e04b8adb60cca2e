// Application layer: the operations a front end calls.
// AuthService hands out authenticated accounts, LedgerService moves money
// between them. Both share one AccountStore.

pub mod auth;
pub mod error;
pub mod ledger;

pub use auth::*;
pub use error::*;
pub use ledger::*;

use crate::config::Config;
use crate::storage::AccountStore;

/// Both services wired to the same store.
pub struct Bank {
    pub auth: AuthService,
    pub ledger: LedgerService,
}

impl Bank {
    pub fn new(store: AccountStore, config: &Config) -> Self {
        let auth = AuthService::new(store.clone())
            .with_bcrypt_cost(config.bcrypt_cost)
            .with_min_username_length(config.min_username_length);
        Self {
            auth,
            ledger: LedgerService::new(store),
        }
    }

    /// Open (creating if needed) the configured database and apply the schema.
    pub async fn open(config: &Config) -> Result<Self, AppError> {
        let store = AccountStore::init(&config.database_url()).await?;
        Ok(Self::new(store, config))
    }

    /// Connect to an existing database.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        let store = AccountStore::connect(&config.existing_database_url()).await?;
        Ok(Self::new(store, config))
    }
}
