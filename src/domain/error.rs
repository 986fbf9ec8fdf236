//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;

use super::AmountError;

/// Errors raised by the account entity itself.
///
/// These represent invariant failures that are detectable without
/// touching storage.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Empty credentials, non-positive or malformed amount
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Withdrawal larger than the current balance
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },
}

impl DomainError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }
}

impl From<AmountError> for DomainError {
    fn from(err: AmountError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
