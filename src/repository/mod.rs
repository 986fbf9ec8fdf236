//! Repository module
//!
//! The persistence contract the bank service is written against, plus a
//! Postgres implementation and an in-memory one for tests.

mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{Account, AccountNumber};

pub use error::RepositoryError;
pub use memory::InMemoryAccountRepository;
pub use postgres::PgAccountRepository;

/// Account store keyed by account number.
///
/// Implementations are the single source of truth for balances. They make
/// each call atomic on its own but give no ordering guarantees across
/// calls; that is the lock manager's job.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account. Fails with `DuplicateKey` if the account
    /// number or login name is already taken.
    async fn create(&self, account: &Account) -> Result<Account, RepositoryError>;

    /// Fetch the current persisted copy of an account
    async fn get(&self, account_number: &AccountNumber) -> Result<Option<Account>, RepositoryError>;

    /// Overwrite the stored balance of an existing account
    async fn update(&self, account: &Account) -> Result<(), RepositoryError>;

    /// Remove an account. Deleting a missing account is not an error.
    async fn delete(&self, account_number: &AccountNumber) -> Result<(), RepositoryError>;

    /// Persist both sides of a transfer as one unit. Neither row changes
    /// unless both exist.
    async fn transfer(&self, from: &Account, to: &Account) -> Result<(), RepositoryError>;

    /// Whether any account is registered under `login_name`
    async fn login_exists(&self, login_name: &str) -> Result<bool, RepositoryError>;

    /// Remove every account. Only meant for test setup and teardown.
    async fn reset_for_testing(&self) -> Result<(), RepositoryError>;
}
