//! HttpNotifier against a local office endpoint

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use rust_decimal_macros::dec;

use rewards_core::{NewWithdrawal, NotificationEvent, NotifierConfig, PayoutMethod, WithdrawalRequest};
use rewards_notifier::{HttpNotifier, Notifier, NotifyError};

#[derive(Clone, Default)]
struct Office {
    received: Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>,
}

async fn accept(
    State(office): State<Office>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    office.received.lock().unwrap().push((auth, body));
    StatusCode::OK
}

async fn refuse() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "office down")
}

/// Serve `router` on an ephemeral port, returning its base URL
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn created_event() -> NotificationEvent {
    let input = NewWithdrawal::new("user-42", dec!(75.00), PayoutMethod::Cash);
    NotificationEvent::created(&WithdrawalRequest::pending(&input, dec!(75.00), false))
}

#[tokio::test]
async fn test_posts_json_with_bearer_token() {
    let office = Office::default();
    let router = Router::new()
        .route("/api/withdrawals/notify", post(accept))
        .with_state(office.clone());
    let base_url = serve(router).await;

    let notifier = HttpNotifier::new(&NotifierConfig::new(base_url, "office-secret")).unwrap();
    let event = created_event();
    notifier.notify(&event).await.unwrap();

    let received = office.received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    let (auth, body) = &received[0];
    assert_eq!(auth.as_deref(), Some("Bearer office-secret"));
    assert_eq!(body["type"], "withdrawal_created");
    assert_eq!(body["data"]["withdrawalId"], event.withdrawal_id());
    assert_eq!(body["data"]["amount"], "75.00");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_non_2xx_is_an_error() {
    let router = Router::new().route("/api/withdrawals/notify", post(refuse));
    let base_url = serve(router).await;

    let notifier = HttpNotifier::new(&NotifierConfig::new(base_url, "k")).unwrap();
    let err = notifier.notify(&created_event()).await.unwrap_err();

    match err {
        NotifyError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "office down");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = NotifierConfig::new(format!("http://{}", addr), "k")
        .with_timeout(Duration::from_secs(2));
    let notifier = HttpNotifier::new(&config).unwrap();

    let err = notifier.notify(&created_event()).await.unwrap_err();
    assert!(matches!(err, NotifyError::Transport(_)));
}
