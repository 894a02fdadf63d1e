//! Withdrawal configuration, injected into intake and processor.

use rust_decimal::Decimal;
use std::time::Duration;

/// Observed floor for a single withdrawal (50.00).
pub const DEFAULT_MINIMUM_WITHDRAWAL: Decimal = Decimal::from_parts(5000, 0, 0, false, 2);

/// Settings for the withdrawal flow.
#[derive(Debug, Clone)]
pub struct WithdrawalConfig {
    /// Smallest amount a user may withdraw
    pub minimum_amount: Decimal,
    /// Office system endpoint; `None` disables notifications
    pub notifier: Option<NotifierConfig>,
}

impl Default for WithdrawalConfig {
    fn default() -> Self {
        Self {
            minimum_amount: DEFAULT_MINIMUM_WITHDRAWAL,
            notifier: None,
        }
    }
}

impl WithdrawalConfig {
    pub fn with_minimum(mut self, minimum_amount: Decimal) -> Self {
        self.minimum_amount = minimum_amount;
        self
    }

    pub fn with_notifier(mut self, notifier: NotifierConfig) -> Self {
        self.notifier = Some(notifier);
        self
    }
}

/// Where and how to reach the office system.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Base URL, e.g. `https://office.example.org`
    pub base_url: String,
    /// Bearer token sent in the `Authorization` header
    pub api_key: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl NotifierConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
