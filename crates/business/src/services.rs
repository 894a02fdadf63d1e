//! Shared context for withdrawal services

use rewards_core::{NotificationEvent, WithdrawalConfig};
use rewards_notifier::{spawn_notify, Notifier, NotifyResult};
use rewards_persistence::Database;
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Everything intake and processor need: store, configuration, notifier
pub struct ServiceContext {
    pool: SqlitePool,
    config: WithdrawalConfig,
    notifier: Arc<dyn Notifier>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl ServiceContext {
    /// Build a context whose notifier follows `config.notifier`
    pub fn new(db: &Database, config: WithdrawalConfig) -> NotifyResult<Self> {
        let notifier = rewards_notifier::from_config(&config)?;
        Ok(Self::with_notifier(db, config, notifier))
    }

    /// Build a context with an explicit notifier
    pub fn with_notifier(
        db: &Database,
        config: WithdrawalConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pool: db.pool().clone(),
            config,
            notifier,
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// Get database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &WithdrawalConfig {
        &self.config
    }

    /// Dispatch `event` without waiting for it
    pub fn notify(&self, event: NotificationEvent) {
        let handle = spawn_notify(self.notifier.clone(), event);
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.retain(|h| !h.is_finished());
            in_flight.push(handle);
        }
    }

    /// Wait up to `grace` for notifications still being delivered.
    ///
    /// For shutdown only; operations never call this.
    pub async fn drain_notifications(&self, grace: Duration) {
        let handles = match self.in_flight.lock() {
            Ok(mut in_flight) => std::mem::take(&mut *in_flight),
            Err(_) => return,
        };
        if handles.is_empty() {
            return;
        }

        let pending = handles.len();
        let wait = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(grace, wait).await.is_err() {
            tracing::warn!(pending, "notifications still in flight at shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewards_core::{NewWithdrawal, PayoutMethod, WithdrawalRequest};
    use rewards_notifier::RecordingNotifier;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_drain_waits_for_delivery() {
        let db = Database::in_memory().await.unwrap();
        let recorder = Arc::new(RecordingNotifier::new());
        let ctx = ServiceContext::with_notifier(&db, WithdrawalConfig::default(), recorder.clone());

        let input = NewWithdrawal::new("user-1", dec!(75), PayoutMethod::Cash);
        let request = WithdrawalRequest::pending(&input, dec!(75), false);
        ctx.notify(NotificationEvent::created(&request));
        ctx.notify(NotificationEvent::created(&request));

        ctx.drain_notifications(Duration::from_secs(1)).await;
        assert_eq!(recorder.events().len(), 2);

        // Nothing left to wait for
        ctx.drain_notifications(Duration::from_millis(1)).await;
    }
}
