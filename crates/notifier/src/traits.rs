//! Notifier trait and the detached dispatcher

use async_trait::async_trait;
use rewards_core::NotificationEvent;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use crate::error::NotifyResult;

/// Destination for withdrawal events
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Name for logging
    fn name(&self) -> &str;

    /// Deliver one event. Errors are reported, not retried.
    async fn notify(&self, event: &NotificationEvent) -> NotifyResult<()>;
}

/// Send `event` on a detached task.
///
/// The caller never waits on delivery; failures end up in the log as
/// `warn!` and go no further.
pub fn spawn_notify(notifier: Arc<dyn Notifier>, event: NotificationEvent) -> JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.notify(&event).await {
            Ok(()) => tracing::debug!(
                notifier = notifier.name(),
                kind = event.kind.as_str(),
                withdrawal_id = event.withdrawal_id(),
                "notification delivered"
            ),
            Err(e) => tracing::warn!(
                notifier = notifier.name(),
                kind = event.kind.as_str(),
                withdrawal_id = event.withdrawal_id(),
                error = %e,
                "notification failed"
            ),
        }
    })
}

/// Drops every event. Used when no office endpoint is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    fn name(&self) -> &str {
        "noop"
    }

    async fn notify(&self, _event: &NotificationEvent) -> NotifyResult<()> {
        Ok(())
    }
}

/// Keeps every event in memory (for testing)
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, event: &NotificationEvent) -> NotifyResult<()> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
        Ok(())
    }
}
