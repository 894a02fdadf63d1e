//! # Rewards Business
//!
//! Business logic layer - withdrawal intake and the processor that moves
//! requests through their lifecycle.

pub mod error;
pub mod intake;
pub mod processor;
pub mod services;

pub use error::{WithdrawalError, WithdrawalResult};
pub use intake::{BalanceCheck, WithdrawalIntake, ADVISORY_TX_TYPE};
pub use processor::{WithdrawalProcessor, SETTLEMENT_TX_TYPE};
pub use services::ServiceContext;
