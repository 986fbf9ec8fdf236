//! bank_ledger Library
//!
//! Account ledger core: account creation, deposit, withdrawal and transfer
//! over a pluggable account repository, with per-account serialization of
//! concurrent balance mutations.

pub mod bank;
pub mod config;
pub mod db;
pub mod domain;
pub mod lock;
pub mod repository;

mod error;

pub use bank::{Bank, BankConfig, TransferReceipt};
pub use config::{Config, ConfigError};
pub use domain::{Account, AccountNumber, Amount, AmountError, Balance, DomainError};
pub use error::{BankError, BankResult, ErrorKind};
pub use lock::{AccountLockGuard, AccountLocks, LockError, LockKey};
pub use repository::{
    AccountRepository, InMemoryAccountRepository, PgAccountRepository, RepositoryError,
};
