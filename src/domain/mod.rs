//! Domain module
//!
//! Core domain types and the balance mutation rules.

pub mod account;
pub mod amount;
pub mod error;

pub use account::{Account, AccountNumber};
pub use amount::{Amount, AmountError, Balance};
pub use error::DomainError;
