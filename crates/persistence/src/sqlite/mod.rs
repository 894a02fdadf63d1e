//! SQLite persistence module
//!
//! Repository pattern for SQLite database access.

pub mod repos;
pub mod schema;

pub use repos::{
    begin_write, create_pool, init_database, memory_pool, run_migrations, DeductionRepo, HistoryRepo,
    LedgerRepo, WalletRepo, WithdrawalFilter, WithdrawalRepo,
};
pub use schema::{
    DeductionRow, LedgerEntryRow, StatusChange, StatusHistoryRow, StatusUpdate, WalletRow,
    WithdrawalRow,
};
