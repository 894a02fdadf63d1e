//! Database schema definitions
//!
//! Row types for sqlx mapping from SQLite tables.
//! Schema is defined in migrations/20261019000000_withdrawals.sql

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, Utc};
use rewards_core::{BankDetails, PayoutMethod, WithdrawalRequest, WithdrawalStatus};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Row type for table `withdrawal_requests`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WithdrawalRow {
    pub id: String,
    pub user_id: String,
    pub amount: String, // Decimal stored as TEXT
    pub payout_method: String,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub owner_name: String,
    pub account_type: Option<String>,
    pub branch_code: Option<String>,
    pub status: String,
    pub admin_notes: Option<String>,
    pub notes: Option<String>,
    pub processed_by: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub needs_reconciliation: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row type for table `wallets`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WalletRow {
    pub user_id: String,
    pub balance: String, // Decimal stored as TEXT
    pub updated_at: DateTime<Utc>,
}

/// Row type for table `wallet_transactions`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerEntryRow {
    pub id: String,
    pub user_id: String,
    pub tx_type: String,
    pub amount: String, // Decimal stored as TEXT
    pub reference_id: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row type for table `withdrawal_deductions`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DeductionRow {
    pub withdrawal_id: String,
    pub user_id: String,
    pub amount: String,
    pub created_at: DateTime<Utc>,
}

/// Row type for table `withdrawal_status_history`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusHistoryRow {
    pub id: i64,
    pub withdrawal_id: String,
    pub from_status: Option<String>,
    pub to_status: String,
    pub actor: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Compare-and-set status write: applied only while the row is still in `from`
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub id: String,
    pub from: WithdrawalStatus,
    pub to: WithdrawalStatus,
    pub processed_by: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of the audit trail
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub withdrawal_id: String,
    pub from: Option<WithdrawalStatus>,
    pub to: WithdrawalStatus,
    pub actor: Option<String>,
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

// === Conversion implementations ===

pub(crate) fn parse_decimal(value: &str) -> PersistenceResult<Decimal> {
    Decimal::from_str(value).map_err(|e| PersistenceError::InvalidDecimal(format!("{value}: {e}")))
}

impl WalletRow {
    pub fn balance(&self) -> PersistenceResult<Decimal> {
        parse_decimal(&self.balance)
    }
}

impl DeductionRow {
    pub fn amount(&self) -> PersistenceResult<Decimal> {
        parse_decimal(&self.amount)
    }
}

impl LedgerEntryRow {
    pub fn amount(&self) -> PersistenceResult<Decimal> {
        parse_decimal(&self.amount)
    }
}

impl TryFrom<WithdrawalRow> for WithdrawalRequest {
    type Error = PersistenceError;

    fn try_from(row: WithdrawalRow) -> Result<Self, Self::Error> {
        let amount = parse_decimal(&row.amount)?;
        let payout_method = PayoutMethod::from_str(&row.payout_method)
            .map_err(|_| PersistenceError::invalid_enum("payout_method", &row.payout_method))?;
        let status = WithdrawalStatus::from_str(&row.status)
            .map_err(|_| PersistenceError::invalid_enum("status", &row.status))?;

        let bank_details = match (row.bank_name, row.account_number) {
            (Some(bank_name), Some(account_number)) => Some(BankDetails {
                bank_name,
                account_number,
                owner_name: row.owner_name.clone(),
                account_type: row.account_type,
                branch_code: row.branch_code,
            }),
            _ => None,
        };

        Ok(WithdrawalRequest {
            id: row.id,
            user_id: row.user_id,
            amount,
            payout_method,
            bank_details,
            owner_name: row.owner_name,
            status,
            admin_notes: row.admin_notes,
            notes: row.notes,
            processed_by: row.processed_by,
            processed_at: row.processed_at,
            needs_reconciliation: row.needs_reconciliation,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&WithdrawalRequest> for WithdrawalRow {
    fn from(request: &WithdrawalRequest) -> Self {
        let bank = request.bank_details.as_ref();
        Self {
            id: request.id.clone(),
            user_id: request.user_id.clone(),
            amount: request.amount.to_string(),
            payout_method: request.payout_method.as_str().to_string(),
            bank_name: bank.map(|b| b.bank_name.clone()),
            account_number: bank.map(|b| b.account_number.clone()),
            owner_name: request.owner_name.clone(),
            account_type: bank.and_then(|b| b.account_type.clone()),
            branch_code: bank.and_then(|b| b.branch_code.clone()),
            status: request.status.as_str().to_string(),
            admin_notes: request.admin_notes.clone(),
            notes: request.notes.clone(),
            processed_by: request.processed_by.clone(),
            processed_at: request.processed_at,
            needs_reconciliation: request.needs_reconciliation,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}
