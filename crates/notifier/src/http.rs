use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use rewards_core::{NotificationEvent, NotifierConfig};

use crate::error::{NotifyError, NotifyResult};
use crate::traits::Notifier;

/// POSTs events as JSON to the office system
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpNotifier {
    pub const NOTIFY_PATH: &'static str = "api/withdrawals/notify";

    pub fn new(config: &NotifierConfig) -> NotifyResult<Self> {
        if config.base_url.is_empty() {
            return Err(NotifyError::Configuration("base_url is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            endpoint: format!("{}/{}", config.base_url, Self::NOTIFY_PATH),
            api_key: config.api_key.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    fn name(&self) -> &str {
        "http"
    }

    async fn notify(&self, event: &NotificationEvent) -> NotifyResult<()> {
        tracing::debug!(url = %self.endpoint, kind = event.kind.as_str(), "posting notification");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(event)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let notifier =
            HttpNotifier::new(&NotifierConfig::new("https://office.example.org/", "k")).unwrap();
        assert_eq!(
            notifier.endpoint(),
            "https://office.example.org/api/withdrawals/notify"
        );
    }

    #[test]
    fn test_empty_base_url() {
        let err = HttpNotifier::new(&NotifierConfig::new("", "k")).unwrap_err();
        assert!(matches!(err, NotifyError::Configuration(_)));
    }
}
