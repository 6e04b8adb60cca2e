use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::application::Bank;
use crate::config::Config;
use crate::domain::{Account, Cents, format_cents, parse_cents};
use crate::io::Exporter;

/// Tellerbook - accounts, transfers and transaction history
#[derive(Parser)]
#[command(name = "tellerbook")]
#[command(about = "A small banking ledger backed by SQLite")]
#[command(version)]
pub struct Cli {
    /// Database file path (overrides the settings file and TELLERBOOK_DB)
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// JSON settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Who is acting. Every account command logs in first.
#[derive(Args)]
pub struct Credentials {
    /// Username
    #[arg(short, long)]
    pub user: String,

    /// Password
    #[arg(short, long)]
    pub password: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Register a new account
    Register {
        /// Username (must be unique)
        username: String,

        /// Password
        #[arg(short, long)]
        password: String,

        /// Repeat the password; registration fails if it differs
        #[arg(long)]
        confirm_password: Option<String>,
    },

    /// Check a username and password
    Login {
        /// Username
        username: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },

    /// Deposit money into your account
    Deposit {
        /// Amount (e.g., "50.00" or "50")
        amount: String,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Withdraw money from your account
    Withdraw {
        /// Amount (e.g., "50.00" or "50")
        amount: String,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Send money to another user
    Transfer {
        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Recipient username
        #[arg(long)]
        to: String,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Show your current balance
    Balance {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Show your past transactions
    History {
        #[command(flatten)]
        credentials: Credentials,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: HistoryFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify that every balance matches its history
    Check,

    /// Recompute your balance from your history
    Reconcile {
        #[command(flatten)]
        credentials: Credentials,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum HistoryFormat {
    Table,
    Csv,
    Json,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let config = Config::load(self.config.as_deref())?;
        Ok(match &self.database {
            Some(path) => config.with_database_path(path),
            None => config,
        })
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config()?;

        match self.command {
            Commands::Init => {
                Bank::open(&config).await?;
                println!("Database initialized: {}", config.database_path.display());
            }

            Commands::Register {
                username,
                password,
                confirm_password,
            } => {
                let bank = Bank::connect(&config).await?;
                let account = match confirm_password {
                    Some(confirm) => {
                        bank.auth
                            .register_confirmed(&username, &password, &confirm)
                            .await?
                    }
                    None => bank.auth.register(&username, &password).await?,
                };
                println!("Registered account: {} ({})", account.username, account.id);
            }

            Commands::Login { username, password } => {
                let bank = Bank::connect(&config).await?;
                let account = bank.auth.login(&username, &password).await?;
                println!("Login successful: {}", account.username);
                print_balance(&account);
            }

            Commands::Deposit {
                amount,
                credentials,
            } => {
                let bank = Bank::connect(&config).await?;
                let account = login(&bank, &credentials).await?;
                let amount_cents = parse_amount(&amount)?;

                let account = bank.ledger.deposit(&account, amount_cents).await?;
                println!("Deposited {}", format_cents(amount_cents));
                print_balance(&account);
            }

            Commands::Withdraw {
                amount,
                credentials,
            } => {
                let bank = Bank::connect(&config).await?;
                let account = login(&bank, &credentials).await?;
                let amount_cents = parse_amount(&amount)?;

                let account = bank.ledger.withdraw(&account, amount_cents).await?;
                println!("Withdrew {}", format_cents(amount_cents));
                print_balance(&account);
            }

            Commands::Transfer {
                amount,
                to,
                credentials,
            } => {
                let bank = Bank::connect(&config).await?;
                let account = login(&bank, &credentials).await?;
                let amount_cents = parse_amount(&amount)?;

                let receipt = bank.ledger.transfer(&account, &to, amount_cents).await?;
                println!(
                    "Transferred {} to {}",
                    format_cents(receipt.amount_cents),
                    receipt.recipient_username
                );
                print_balance(&receipt.sender);
            }

            Commands::Balance { credentials } => {
                let bank = Bank::connect(&config).await?;
                let account = login(&bank, &credentials).await?;
                print_balance(&account);
            }

            Commands::History {
                credentials,
                format,
                output,
            } => {
                let bank = Bank::connect(&config).await?;
                let account = login(&bank, &credentials).await?;
                run_history_command(&bank, &account, format, output).await?;
            }

            Commands::Check => {
                let bank = Bank::connect(&config).await?;
                run_check_command(&bank).await?;
            }

            Commands::Reconcile { credentials } => {
                let bank = Bank::connect(&config).await?;
                let account = login(&bank, &credentials).await?;
                let before = account.balance;

                let account = bank.ledger.reconcile(&account).await?;
                if account.balance == before {
                    println!("Balance already matches history.");
                } else {
                    println!(
                        "Balance corrected: {} -> {}",
                        format_cents(before),
                        format_cents(account.balance)
                    );
                }
                print_balance(&account);
            }
        }

        Ok(())
    }
}

async fn login(bank: &Bank, credentials: &Credentials) -> Result<Account> {
    Ok(bank
        .auth
        .login(&credentials.user, &credentials.password)
        .await?)
}

fn parse_amount(amount: &str) -> Result<Cents> {
    parse_cents(amount).context("Invalid amount format. Use '50.00' or '50'")
}

fn print_balance(account: &Account) {
    println!("Current balance: {}", format_cents(account.balance));
}

async fn run_history_command(
    bank: &Bank,
    account: &Account,
    format: HistoryFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    let exporter = Exporter::new(&bank.ledger);
    match format {
        HistoryFormat::Table => {
            let records = bank.ledger.history(account).await?;
            write_history_table(&records, writer)?;
        }
        HistoryFormat::Csv => {
            let count = exporter.export_history_csv(account, writer).await?;
            if let Some(path) = output {
                eprintln!("Exported {} transactions to {}", count, path.display());
            }
        }
        HistoryFormat::Json => {
            let snapshot = exporter.export_history_json(account, writer).await?;
            if let Some(path) = output {
                eprintln!(
                    "Exported {} transactions to {}",
                    snapshot.transactions.len(),
                    path.display()
                );
            }
        }
    }

    Ok(())
}

fn write_history_table(
    records: &[crate::domain::TransactionRecord],
    mut writer: impl Write,
) -> Result<()> {
    if records.is_empty() {
        writeln!(writer, "No transactions found.")?;
        return Ok(());
    }

    writeln!(writer, "{:<20} {:<12} {:>12}", "DATE", "TYPE", "AMOUNT")?;
    writeln!(writer, "{}", "-".repeat(46))?;
    for record in records {
        writeln!(
            writer,
            "{:<20} {:<12} {:>12}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.kind.as_str(),
            format_cents(record.amount_cents)
        )?;
    }
    Ok(())
}

async fn run_check_command(bank: &Bank) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = bank.ledger.check_integrity().await?;

    println!("Accounts:     {}", report.account_count);
    println!("Transactions: {}", report.transaction_count);
    println!("Total balance: {}", format_cents(report.total_balance));
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for mismatch in &report.mismatches {
            println!("  - {}", mismatch);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}
