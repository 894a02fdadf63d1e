//! Business layer errors
//!
//! The error taxonomy callers of intake and processor see. Domain errors
//! carry enough detail to fix the input; `StoreUnavailable` means retry.
//! Notification failures never appear here.

use rewards_core::{CoreError, WithdrawalAction, WithdrawalStatus};
use rewards_persistence::PersistenceError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Withdrawal operation errors
#[derive(Debug, Error)]
pub enum WithdrawalError {
    // === Validation errors ===
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Amount {amount} is below the minimum withdrawal of {minimum}")]
    BelowMinimum { amount: Decimal, minimum: Decimal },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },

    // === State machine errors ===
    #[error("Cannot {action} withdrawal {id}: status is {from}")]
    InvalidTransition {
        id: String,
        from: WithdrawalStatus,
        action: WithdrawalAction,
    },

    // === Not found errors ===
    #[error("Withdrawal not found: {0}")]
    NotFound(String),

    // === Infrastructure errors ===
    #[error("Withdrawal store unavailable: {0}")]
    StoreUnavailable(#[source] PersistenceError),
}

/// Result type alias for withdrawal operations
pub type WithdrawalResult<T> = Result<T, WithdrawalError>;

impl WithdrawalError {
    pub fn insufficient_balance(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientBalance {
            required,
            available,
        }
    }

    /// Attach the withdrawal id to a core error
    pub fn from_core(id: &str, err: CoreError) -> Self {
        match err {
            CoreError::InvalidTransition { from, action } => Self::InvalidTransition {
                id: id.to_string(),
                from,
                action,
            },
            other => Self::from(other),
        }
    }

    /// Only infrastructure failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    pub fn is_domain_error(&self) -> bool {
        !self.is_retryable()
    }
}

impl From<CoreError> for WithdrawalError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            CoreError::BelowMinimum { amount, minimum } => Self::BelowMinimum { amount, minimum },
            CoreError::InvalidTransition { from, action } => Self::InvalidTransition {
                id: String::new(),
                from,
                action,
            },
            err @ CoreError::InvalidEnumValue { .. } => Self::InvalidRequest(err.to_string()),
        }
    }
}

impl From<PersistenceError> for WithdrawalError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound { id, .. } => Self::NotFound(id),
            other => Self::StoreUnavailable(other),
        }
    }
}

impl From<sqlx::Error> for WithdrawalError {
    fn from(err: sqlx::Error) -> Self {
        Self::StoreUnavailable(PersistenceError::Database(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_balance_error() {
        let err = WithdrawalError::insufficient_balance(dec!(100), dec!(50));
        assert!(err.to_string().contains("required 100"));
        assert!(err.to_string().contains("available 50"));
        assert!(err.is_domain_error());
    }

    #[test]
    fn test_transition_error_carries_id() {
        let core = CoreError::InvalidTransition {
            from: WithdrawalStatus::Pending,
            action: WithdrawalAction::Complete,
        };
        let err = WithdrawalError::from_core("w-9", core);
        assert_eq!(
            err.to_string(),
            "Cannot complete withdrawal w-9: status is pending"
        );
    }

    #[test]
    fn test_persistence_mapping() {
        let err = WithdrawalError::from(PersistenceError::not_found("Withdrawal", "w-1"));
        assert!(matches!(err, WithdrawalError::NotFound(ref id) if id == "w-1"));
        assert!(!err.is_retryable());

        let err = WithdrawalError::from(sqlx::Error::PoolClosed);
        assert!(err.is_retryable());
        assert!(!err.is_domain_error());
    }

    #[test]
    fn test_enum_error_is_invalid_request() {
        let err = WithdrawalError::from(CoreError::invalid_enum("payout_method", "cheque"));
        assert!(matches!(err, WithdrawalError::InvalidRequest(_)));
    }
}
