//! # Error Module
//!
//! Domain errors for withdrawals, built with thiserror.

use crate::withdrawal::{WithdrawalAction, WithdrawalStatus};
use rust_decimal::Decimal;
use thiserror::Error;

/// Core domain errors.
///
/// Validation and state machine failures only; nothing here is about
/// infrastructure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // === Validation errors ===
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Amount {amount} is below the minimum withdrawal of {minimum}")]
    BelowMinimum { amount: Decimal, minimum: Decimal },

    // === State machine errors ===
    #[error("Cannot {action} a withdrawal that is {from}")]
    InvalidTransition {
        from: WithdrawalStatus,
        action: WithdrawalAction,
    },

    // === Parse errors ===
    #[error("Invalid value for {field}: {value}")]
    InvalidEnumValue { field: String, value: String },
}

/// Result type alias with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn invalid_enum(field: &str, value: &str) -> Self {
        Self::InvalidEnumValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, CoreError::InvalidTransition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_display() {
        let err = CoreError::BelowMinimum {
            amount: dec!(49.99),
            minimum: dec!(50.00),
        };
        assert_eq!(
            err.to_string(),
            "Amount 49.99 is below the minimum withdrawal of 50.00"
        );

        let err = CoreError::InvalidTransition {
            from: WithdrawalStatus::Pending,
            action: WithdrawalAction::Complete,
        };
        assert_eq!(err.to_string(), "Cannot complete a withdrawal that is pending");
        assert!(err.is_invalid_transition());
    }

    #[test]
    fn test_invalid_enum() {
        let err = CoreError::invalid_enum("payout_method", "cheque");
        assert!(err.to_string().contains("payout_method"));
        assert!(err.to_string().contains("cheque"));
        assert!(!err.is_invalid_transition());
    }
}
