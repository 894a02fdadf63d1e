//! Notification envelope sent to the office system.
//!
//! Wire shape: `{"type": ..., "data": {...}, "timestamp": "<rfc3339>"}`.

use crate::withdrawal::{PayoutMethod, WithdrawalRequest, WithdrawalStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What happened to the withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    WithdrawalCreated,
    WithdrawalStatusChanged,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::WithdrawalCreated => "withdrawal_created",
            NotificationKind::WithdrawalStatusChanged => "withdrawal_status_changed",
        }
    }
}

/// Snapshot of the request at the moment of the event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalNotice {
    pub withdrawal_id: String,
    pub user_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub status: WithdrawalStatus,
    pub payout_method: PayoutMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<WithdrawalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub data: WithdrawalNotice,
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn created(request: &WithdrawalRequest) -> Self {
        Self {
            kind: NotificationKind::WithdrawalCreated,
            data: WithdrawalNotice::from_request(request, None),
            timestamp: Utc::now(),
        }
    }

    pub fn status_changed(request: &WithdrawalRequest, previous: WithdrawalStatus) -> Self {
        Self {
            kind: NotificationKind::WithdrawalStatusChanged,
            data: WithdrawalNotice::from_request(request, Some(previous)),
            timestamp: Utc::now(),
        }
    }

    pub fn withdrawal_id(&self) -> &str {
        &self.data.withdrawal_id
    }
}

impl WithdrawalNotice {
    fn from_request(request: &WithdrawalRequest, previous: Option<WithdrawalStatus>) -> Self {
        Self {
            withdrawal_id: request.id.clone(),
            user_id: request.user_id.clone(),
            amount: request.amount,
            status: request.status,
            payout_method: request.payout_method,
            previous_status: previous,
            processed_by: request.processed_by.clone(),
            notes: request.admin_notes.clone(),
        }
    }
}
