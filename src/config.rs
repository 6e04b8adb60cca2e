//! Runtime configuration
//!
//! Read from an optional JSON settings file:
//! ```json
//! { "databasePath": "bank.db", "bcryptCost": 12, "minUsernameLength": 6 }
//! ```
//! Missing keys fall back to defaults. `TELLERBOOK_DB` overrides the
//! database path from the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::domain::{MAX_USERNAME_LENGTH, PasswordHash};

/// Environment variable that overrides the configured database path
pub const DATABASE_ENV_VAR: &str = "TELLERBOOK_DB";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub database_path: PathBuf,
    pub bcrypt_cost: u32,
    pub min_username_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("tellerbook.db"),
            bcrypt_cost: PasswordHash::DEFAULT_COST,
            min_username_length: 1,
        }
    }
}

impl Config {
    /// Load settings from `settings_path` if given, then apply the environment.
    pub fn load(settings_path: Option<&Path>) -> Result<Self> {
        let mut config = match settings_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_database_override(std::env::var(DATABASE_ENV_VAR).ok());
        config.validate()?;
        Ok(config)
    }

    /// Replace the database path with `value` unless it is unset or empty.
    fn apply_database_override(&mut self, value: Option<String>) {
        if let Some(path) = value.filter(|path| !path.is_empty()) {
            self.database_path = PathBuf::from(path);
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if !(4..=31).contains(&self.bcrypt_cost) {
            bail!("bcryptCost must be between 4 and 31, got {}", self.bcrypt_cost);
        }
        if self.min_username_length > MAX_USERNAME_LENGTH {
            bail!(
                "minUsernameLength must be at most {}, got {}",
                MAX_USERNAME_LENGTH,
                self.min_username_length
            );
        }
        Ok(())
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// sqlx URL for the database, creating the file if it is missing.
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.database_path.display())
    }

    /// sqlx URL that fails to connect if the database file does not exist.
    pub fn existing_database_url(&self) -> String {
        format!("sqlite:{}", self.database_path.display())
    }
}
