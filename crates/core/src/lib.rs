//! # Rewards Core
//!
//! Core domain types for the withdrawal request lifecycle.
//!
//! ```text
//!            approve            begin_processing          complete
//!  pending ──────────► approved ────────────────► processing ───────► completed
//!   │    │                │                           │
//!   │    │ cancel         │ cancel                    │ cancel
//!   │    ▼                ▼                           ▼
//!   │  cancelled      cancelled                   cancelled
//!   │ reject
//!   ▼
//!  rejected
//! ```
//!
//! Nothing in this crate performs I/O. Persistence lives in
//! `rewards-persistence`, delivery to the office system in
//! `rewards-notifier`, orchestration in `rewards-business`.

pub mod config;
pub mod error;
pub mod notification;
pub mod withdrawal;

pub use config::{NotifierConfig, WithdrawalConfig, DEFAULT_MINIMUM_WITHDRAWAL};
pub use error::{CoreError, CoreResult};
pub use notification::{NotificationEvent, NotificationKind, WithdrawalNotice};
pub use withdrawal::{
    BankDetails, NewWithdrawal, PayoutMethod, WithdrawalAction, WithdrawalRequest,
    WithdrawalStatus,
};
