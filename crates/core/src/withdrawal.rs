//! # Withdrawal Module
//!
//! A user's request to turn wallet balance into an external payout,
//! and the status machine that request moves through.

use crate::config::WithdrawalConfig;
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Payout method
// ============================================================================

/// Channel through which funds are disbursed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    BankTransfer,
    Cash,
    MobileMoney,
    Wallet,
}

impl PayoutMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutMethod::BankTransfer => "bank_transfer",
            PayoutMethod::Cash => "cash",
            PayoutMethod::MobileMoney => "mobile_money",
            PayoutMethod::Wallet => "wallet",
        }
    }

    pub fn requires_bank_details(&self) -> bool {
        matches!(self, PayoutMethod::BankTransfer)
    }

    /// Stand-in for `owner_name` when there is no bank account holder.
    /// The column is NOT NULL upstream.
    pub fn placeholder_owner_name(&self) -> &'static str {
        match self {
            PayoutMethod::BankTransfer => "Bank Transfer",
            PayoutMethod::Cash => "Cash Payment",
            PayoutMethod::MobileMoney => "Mobile Money Payment",
            PayoutMethod::Wallet => "Wallet Payment",
        }
    }
}

impl FromStr for PayoutMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bank_transfer" => Ok(PayoutMethod::BankTransfer),
            "cash" => Ok(PayoutMethod::Cash),
            "mobile_money" => Ok(PayoutMethod::MobileMoney),
            "wallet" => Ok(PayoutMethod::Wallet),
            other => Err(CoreError::invalid_enum("payout_method", other)),
        }
    }
}

impl fmt::Display for PayoutMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Bank details
// ============================================================================

/// Bank account the payout goes to. Only meaningful for bank transfers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub bank_name: String,
    pub account_number: String,
    pub owner_name: String,
    pub account_type: Option<String>,
    pub branch_code: Option<String>,
}

impl BankDetails {
    pub fn new(bank_name: &str, account_number: &str, owner_name: &str) -> Self {
        Self {
            bank_name: bank_name.to_string(),
            account_number: account_number.to_string(),
            owner_name: owner_name.to_string(),
            account_type: None,
            branch_code: None,
        }
    }

    pub fn with_account_type(mut self, account_type: &str) -> Self {
        self.account_type = Some(account_type.to_string());
        self
    }

    pub fn with_branch_code(mut self, branch_code: &str) -> Self {
        self.branch_code = Some(branch_code.to_string());
        self
    }

    /// Names of the mandatory fields that are blank
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.bank_name.trim().is_empty() {
            missing.push("bankName");
        }
        if self.account_number.trim().is_empty() {
            missing.push("accountNumber");
        }
        if self.owner_name.trim().is_empty() {
            missing.push("ownerName");
        }
        missing
    }
}

// ============================================================================
// Status machine
// ============================================================================

/// Lifecycle state of a withdrawal request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Processing,
    Completed,
    Rejected,
    Cancelled,
}

impl WithdrawalStatus {
    pub const ALL: [WithdrawalStatus; 6] = [
        WithdrawalStatus::Pending,
        WithdrawalStatus::Approved,
        WithdrawalStatus::Processing,
        WithdrawalStatus::Completed,
        WithdrawalStatus::Rejected,
        WithdrawalStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Rejected => "rejected",
            WithdrawalStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WithdrawalStatus::Completed | WithdrawalStatus::Rejected | WithdrawalStatus::Cancelled
        )
    }

    /// Actions that are legal from this state
    pub fn allowed_actions(&self) -> &'static [WithdrawalAction] {
        use WithdrawalAction::*;
        match self {
            WithdrawalStatus::Pending => &[Approve, Reject, Cancel],
            WithdrawalStatus::Approved => &[BeginProcessing, Cancel],
            WithdrawalStatus::Processing => &[Complete, Cancel],
            WithdrawalStatus::Completed
            | WithdrawalStatus::Rejected
            | WithdrawalStatus::Cancelled => &[],
        }
    }

    /// Resulting state of `action`, or `InvalidTransition`
    pub fn apply(self, action: WithdrawalAction) -> CoreResult<WithdrawalStatus> {
        use WithdrawalAction::*;
        use WithdrawalStatus::*;

        let next = match (self, action) {
            (Pending, Approve) => Approved,
            (Pending, Reject) => Rejected,
            (Approved, BeginProcessing) => Processing,
            (Processing, Complete) => Completed,
            (Pending | Approved | Processing, Cancel) => Cancelled,
            (from, action) => return Err(CoreError::InvalidTransition { from, action }),
        };
        Ok(next)
    }
}

impl FromStr for WithdrawalStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WithdrawalStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| CoreError::invalid_enum("status", s))
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events an operator can apply to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalAction {
    Approve,
    Reject,
    BeginProcessing,
    Complete,
    Cancel,
}

impl WithdrawalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalAction::Approve => "approve",
            WithdrawalAction::Reject => "reject",
            WithdrawalAction::BeginProcessing => "begin_processing",
            WithdrawalAction::Complete => "complete",
            WithdrawalAction::Cancel => "cancel",
        }
    }

    /// Whether the transition stamps `processed_by` / `processed_at`
    pub fn records_processor(&self) -> bool {
        !matches!(self, WithdrawalAction::BeginProcessing)
    }
}

impl fmt::Display for WithdrawalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Intake input
// ============================================================================

/// Input to withdrawal intake, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWithdrawal {
    pub user_id: String,
    pub amount: Option<Decimal>,
    pub payout_method: Option<PayoutMethod>,
    pub bank_details: Option<BankDetails>,
    pub notes: Option<String>,
}

impl NewWithdrawal {
    pub fn new(user_id: &str, amount: Decimal, payout_method: PayoutMethod) -> Self {
        Self {
            user_id: user_id.to_string(),
            amount: Some(amount),
            payout_method: Some(payout_method),
            bank_details: None,
            notes: None,
        }
    }

    pub fn with_bank_details(mut self, bank_details: BankDetails) -> Self {
        self.bank_details = Some(bank_details);
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    /// Payout method, cash when unspecified
    pub fn method(&self) -> PayoutMethod {
        self.payout_method.unwrap_or(PayoutMethod::Cash)
    }

    /// Stateless checks, fail-fast in a fixed order: required fields,
    /// bank details, then the minimum. Returns the validated amount.
    pub fn validate(&self, config: &WithdrawalConfig) -> CoreResult<Decimal> {
        if self.user_id.trim().is_empty() {
            return Err(CoreError::invalid_request("userId is required"));
        }
        let amount = self
            .amount
            .ok_or_else(|| CoreError::invalid_request("amount is required"))?;
        if amount <= Decimal::ZERO {
            return Err(CoreError::invalid_request(format!(
                "amount must be positive: {}",
                amount
            )));
        }

        if self.method().requires_bank_details() {
            let missing = match &self.bank_details {
                Some(details) => details.missing_fields(),
                None => vec!["bankName", "accountNumber", "ownerName"],
            };
            if !missing.is_empty() {
                return Err(CoreError::invalid_request(format!(
                    "bank_transfer requires {}",
                    missing.join(", ")
                )));
            }
        }

        if amount < config.minimum_amount {
            return Err(CoreError::BelowMinimum {
                amount,
                minimum: config.minimum_amount,
            });
        }

        Ok(amount)
    }
}

// ============================================================================
// Withdrawal request
// ============================================================================

/// A persisted withdrawal request.
///
/// `amount` and `user_id` never change after creation; `status` only
/// moves through [`WithdrawalStatus::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub payout_method: PayoutMethod,
    pub bank_details: Option<BankDetails>,
    /// Account holder, or a method placeholder for non-bank payouts
    pub owner_name: String,
    pub status: WithdrawalStatus,
    /// Operator notes (rejection reason, etc.)
    pub admin_notes: Option<String>,
    /// User-supplied notes
    pub notes: Option<String>,
    pub processed_by: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    /// Set when the balance could not be confirmed or deducted
    pub needs_reconciliation: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WithdrawalRequest {
    /// Build a fresh `pending` request from already-validated input.
    ///
    /// Bank details are dropped for methods that do not use them.
    pub fn pending(input: &NewWithdrawal, amount: Decimal, needs_reconciliation: bool) -> Self {
        let method = input.method();
        let bank_details = if method.requires_bank_details() {
            input.bank_details.clone()
        } else {
            None
        };
        let owner_name = bank_details
            .as_ref()
            .map(|d| d.owner_name.trim().to_string())
            .unwrap_or_else(|| method.placeholder_owner_name().to_string());
        let now = Utc::now();

        Self {
            id: Self::generate_id(),
            user_id: input.user_id.trim().to_string(),
            amount,
            payout_method: method,
            bank_details,
            owner_name,
            status: WithdrawalStatus::Pending,
            admin_notes: None,
            notes: input.notes.clone(),
            processed_by: None,
            processed_at: None,
            needs_reconciliation,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl fmt::Display for WithdrawalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Withdrawal {} ({} {} via {}, status: {})",
            self.id, self.user_id, self.amount, self.payout_method, self.status
        )
    }
}
