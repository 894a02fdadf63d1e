//! # Rewards Persistence
//!
//! SQLite persistence for the withdrawal lifecycle.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Database                            │
//! │  ┌──────────────────────┐  ┌──────────┐  ┌────────────────┐  │
//! │  │ withdrawal_requests  │  │ wallets  │  │ wallet_        │  │
//! │  │ + status_history     │  │ (balance)│  │ transactions   │  │
//! │  │ + deductions         │  │          │  │ (ledger)       │  │
//! │  └──────────────────────┘  └──────────┘  └────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rewards_persistence::{Database, WithdrawalFilter, WithdrawalRepo};
//!
//! let db = Database::init("sqlite:data/rewards.db").await?;
//! let pending = WithdrawalRepo::list(db.pool(), &WithdrawalFilter::default()).await?;
//! ```

pub mod error;
pub mod sqlite;

pub use error::{PersistenceError, PersistenceResult};
pub use sqlite::schema::{
    DeductionRow, LedgerEntryRow, StatusChange, StatusHistoryRow, StatusUpdate, WalletRow,
    WithdrawalRow,
};
pub use sqlite::{
    begin_write, init_database, memory_pool, DeductionRepo, HistoryRepo, LedgerRepo, WalletRepo,
    WithdrawalFilter, WithdrawalRepo,
};

use sqlx::SqlitePool;

/// Database facade
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to an existing database without touching its schema
    ///
    /// # Arguments
    /// * `db_url` - SQLite database URL (e.g., "sqlite:rewards.db")
    pub async fn connect(db_url: &str) -> PersistenceResult<Self> {
        let pool = sqlite::create_pool(db_url).await?;
        Ok(Self { pool })
    }

    /// Open or create a database and run migrations
    pub async fn init(db_url: &str) -> PersistenceResult<Self> {
        let pool = init_database(db_url).await?;
        Ok(Self { pool })
    }

    /// Migrated in-memory database
    pub async fn in_memory() -> PersistenceResult<Self> {
        let pool = memory_pool().await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
