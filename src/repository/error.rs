//! Repository Errors
//!
//! Error types for account persistence.

/// Errors that can occur in an account repository
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A unique column (account number or login name) already holds this value
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// No row for this account number
    #[error("Account not found: {0}")]
    NotFound(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row violates a domain invariant
    #[error("Corrupt account row: {0}")]
    CorruptRow(String),
}

impl RepositoryError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepositoryError::Database(_))
    }
}
