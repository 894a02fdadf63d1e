//! Rewards CLI - withdrawal operations from the command line
//!
//! Usage:
//! ```bash
//! rewards init
//! rewards wallet set user-1 100
//! rewards withdraw request --user user-1 --amount 75 --method cash
//! rewards withdraw approve <ID> --by admin-1
//! rewards withdraw begin <ID> --by admin-1
//! rewards withdraw complete <ID> --by admin-1
//! rewards withdraw list --status pending
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rewards_core::{NotifierConfig, PayoutMethod, WithdrawalConfig, WithdrawalStatus};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod db;

use commands::{wallet, withdraw};

/// Rewards - withdrawal requests over SQLite, with office notifications
#[derive(Parser)]
#[command(name = "rewards")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, env = "REWARDS_DB", default_value = "data/rewards.db", global = true)]
    pub db: PathBuf,

    /// Smallest amount a user may withdraw
    #[arg(long, env = "REWARDS_MIN_WITHDRAWAL", default_value = "50.00", global = true)]
    pub min_withdrawal: Decimal,

    /// Office system base URL; notifications are off when unset
    #[arg(long, env = "OFFICE_API_URL", global = true)]
    pub office_url: Option<String>,

    /// Bearer token for the office system
    #[arg(long, env = "OFFICE_API_KEY", hide_env_values = true, global = true)]
    pub office_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn withdrawal_config(&self) -> Result<WithdrawalConfig> {
        let config = WithdrawalConfig::default().with_minimum(self.min_withdrawal);
        let Some(url) = &self.office_url else {
            return Ok(config);
        };
        match self.office_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                Ok(config.with_notifier(NotifierConfig::new(url.as_str(), key)))
            }
            _ => bail!("--office-url is set but --office-key (OFFICE_API_KEY) is missing"),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and apply migrations
    Init {
        /// Drop the existing database first
        #[arg(long)]
        force: bool,
    },

    /// Show database status
    Status,

    /// Wallet balances
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },

    /// Withdrawal requests
    Withdraw {
        #[command(subcommand)]
        action: WithdrawAction,
    },
}

#[derive(Subcommand)]
pub enum WalletAction {
    /// Set a user's balance
    Set {
        user_id: String,
        balance: Decimal,
    },
    /// Show a user's balance and ledger
    Show { user_id: String },
}

#[derive(Subcommand)]
pub enum WithdrawAction {
    /// Submit a new withdrawal request
    Request {
        #[arg(long)]
        user: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long, value_enum, default_value = "cash")]
        method: PayoutMethodArg,
        #[arg(long)]
        bank_name: Option<String>,
        #[arg(long)]
        account_number: Option<String>,
        #[arg(long)]
        owner_name: Option<String>,
        #[arg(long)]
        account_type: Option<String>,
        #[arg(long)]
        branch_code: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// pending → approved
    Approve {
        id: String,
        #[arg(long)]
        by: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// pending → rejected
    Reject {
        id: String,
        #[arg(long)]
        by: String,
        #[arg(long)]
        reason: String,
    },
    /// approved → processing
    Begin {
        id: String,
        #[arg(long)]
        by: String,
    },
    /// processing → completed
    Complete {
        id: String,
        #[arg(long)]
        by: String,
    },
    /// Cancel an open request
    Cancel {
        id: String,
        #[arg(long)]
        by: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Show one request as JSON
    Show { id: String },
    /// List requests
    List {
        #[arg(long)]
        user: Option<String>,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Show the status trail of a request
    History { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PayoutMethodArg {
    BankTransfer,
    Cash,
    MobileMoney,
    Wallet,
}

impl PayoutMethodArg {
    pub fn to_core_type(self) -> PayoutMethod {
        match self {
            PayoutMethodArg::BankTransfer => PayoutMethod::BankTransfer,
            PayoutMethodArg::Cash => PayoutMethod::Cash,
            PayoutMethodArg::MobileMoney => PayoutMethod::MobileMoney,
            PayoutMethodArg::Wallet => PayoutMethod::Wallet,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Pending,
    Approved,
    Processing,
    Completed,
    Rejected,
    Cancelled,
}

impl StatusArg {
    pub fn to_core_type(self) -> WithdrawalStatus {
        match self {
            StatusArg::Pending => WithdrawalStatus::Pending,
            StatusArg::Approved => WithdrawalStatus::Approved,
            StatusArg::Processing => WithdrawalStatus::Processing,
            StatusArg::Completed => WithdrawalStatus::Completed,
            StatusArg::Rejected => WithdrawalStatus::Rejected,
            StatusArg::Cancelled => WithdrawalStatus::Cancelled,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Some(parent) = cli.db.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
        }
    }

    match &cli.command {
        Commands::Init { force } => {
            db::init_database(&cli.db, *force).await?;
            println!("✅ Database initialized at {:?}", cli.db);
        }

        Commands::Status => {
            db::show_status(&cli.db).await?;
        }

        Commands::Wallet { action } => {
            wallet::handle(&cli.db, action).await?;
        }

        Commands::Withdraw { action } => {
            withdraw::handle(&cli.db, cli.withdrawal_config()?, action).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::str::FromStr;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_request() {
        let cli = Cli::try_parse_from([
            "rewards", "withdraw", "request", "--user", "user-1", "--amount", "75.00", "--method",
            "bank-transfer", "--bank-name", "FNB",
        ])
        .unwrap();

        match cli.command {
            Commands::Withdraw {
                action:
                    WithdrawAction::Request {
                        user,
                        amount,
                        method,
                        bank_name,
                        ..
                    },
            } => {
                assert_eq!(user, "user-1");
                assert_eq!(amount, Decimal::from_str("75.00").unwrap());
                assert_eq!(method.to_core_type(), PayoutMethod::BankTransfer);
                assert_eq!(bank_name.as_deref(), Some("FNB"));
            }
            _ => panic!("expected withdraw request"),
        }
    }

    #[test]
    fn test_withdrawal_config_from_flags() {
        let cli = Cli::try_parse_from([
            "rewards",
            "--min-withdrawal",
            "20",
            "--office-url",
            "https://office.example.org/",
            "--office-key",
            "k",
            "status",
        ])
        .unwrap();

        let config = cli.withdrawal_config().unwrap();
        assert_eq!(config.minimum_amount, Decimal::from(20));
        let notifier = config.notifier.unwrap();
        assert_eq!(notifier.base_url, "https://office.example.org");
        assert_eq!(notifier.api_key, "k");
    }

    #[test]
    fn test_office_url_requires_key() {
        let cli = Cli::try_parse_from([
            "rewards",
            "--office-url",
            "https://office.example.org",
            "--office-key",
            " ",
            "status",
        ])
        .unwrap();
        assert!(cli.withdrawal_config().is_err());

        let cli = Cli::try_parse_from(["rewards", "--office-key", "k", "status"]).unwrap();
        assert!(cli.withdrawal_config().unwrap().notifier.is_none());
    }
}
