//! # Rewards Notifier
//!
//! Fire-and-forget delivery of withdrawal events to the office system.
//!
//! Delivery is at-most-once. A failed POST is logged and dropped; it never
//! affects the state transition that produced the event.

mod error;
mod http;
mod traits;

pub use error::{NotifyError, NotifyResult};
pub use http::HttpNotifier;
pub use traits::{spawn_notify, Notifier, NoopNotifier, RecordingNotifier};

use rewards_core::WithdrawalConfig;
use std::sync::Arc;

/// Notifier for a configuration: HTTP when an endpoint is set, no-op otherwise
pub fn from_config(config: &WithdrawalConfig) -> NotifyResult<Arc<dyn Notifier>> {
    match &config.notifier {
        Some(cfg) => Ok(Arc::new(HttpNotifier::new(cfg)?)),
        None => Ok(Arc::new(NoopNotifier)),
    }
}
