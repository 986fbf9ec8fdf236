//! Error handling module
//!
//! The error type every bank operation returns, and a flat kind for callers
//! that only need to branch on the condition.

use rust_decimal::Decimal;
use std::time::Duration;

use crate::domain::DomainError;
use crate::lock::LockError;
use crate::repository::RepositoryError;

/// Result type of every bank operation
pub type BankResult<T> = Result<T, BankError>;

/// Bank error types
#[derive(Debug, thiserror::Error)]
pub enum BankError {
    // Caller errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} account is missing")]
    NullAccount(&'static str),

    #[error("Login name {0} already exists")]
    DuplicateLogin(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    // Contention
    #[error("Timed out after {waited:?} waiting for {key}")]
    Timeout { key: String, waited: Duration },

    // Storage failures
    #[error("Storage error: {0}")]
    Storage(#[source] RepositoryError),
}

/// Error condition without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NullAccount,
    DuplicateLogin,
    AccountNotFound,
    InsufficientFunds,
    Timeout,
    Storage,
}

impl BankError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BankError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            BankError::NullAccount(_) => ErrorKind::NullAccount,
            BankError::DuplicateLogin(_) => ErrorKind::DuplicateLogin,
            BankError::AccountNotFound(_) => ErrorKind::AccountNotFound,
            BankError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            BankError::Timeout { .. } => ErrorKind::Timeout,
            BankError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidArgument
                | ErrorKind::NullAccount
                | ErrorKind::DuplicateLogin
                | ErrorKind::AccountNotFound
                | ErrorKind::InsufficientFunds
        )
    }

    /// Check if retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            BankError::Timeout { .. } => true,
            BankError::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<DomainError> for BankError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidArgument(msg) => BankError::InvalidArgument(msg),
            DomainError::InsufficientFunds {
                required,
                available,
            } => BankError::InsufficientFunds {
                required,
                available,
            },
        }
    }
}

impl From<LockError> for BankError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout { key, waited } => BankError::Timeout { key, waited },
        }
    }
}

impl From<RepositoryError> for BankError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(number) => BankError::AccountNotFound(number),
            other => {
                tracing::error!("Storage error: {:?}", other);
                BankError::Storage(other)
            }
        }
    }
}
