//! Notification errors. Logged by the dispatcher, never surfaced to callers
//! of the withdrawal operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Office system answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid notifier configuration: {0}")]
    Configuration(String),
}

pub type NotifyResult<T> = Result<T, NotifyError>;
