//! Account Entity
//!
//! An account owns a balance and the two primitives that mutate it.
//! Persistence is never touched here; the bank service fetches, mutates
//! and writes back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{Amount, Balance, DomainError};

/// External, immutable account identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Generate a fresh, globally unique account number
    pub fn generate() -> Self {
        Self(format!("ACC-{}", Uuid::new_v4().simple()).to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AccountNumber {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AccountNumber {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for AccountNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Account entity
///
/// # Invariants
/// - `login_name` and `password` are non-empty
/// - `account_number` never changes after construction
/// - `balance` is never negative
#[derive(Clone, PartialEq, Serialize)]
pub struct Account {
    id: Uuid,
    login_name: String,
    account_number: AccountNumber,
    // Stored as given; hashing is left to whoever owns authentication.
    #[serde(skip)]
    password: String,
    balance: Balance,
    created_at: DateTime<Utc>,
}

impl Account {
    /// Create a brand new account with a freshly generated account number.
    ///
    /// # Errors
    /// `DomainError::InvalidArgument` if the login name or password is empty,
    /// or the initial balance is negative or out of range.
    pub fn new(
        login_name: impl Into<String>,
        password: impl Into<String>,
        initial_balance: Decimal,
    ) -> Result<Self, DomainError> {
        let login_name = login_name.into();
        let password = password.into();

        if login_name.is_empty() {
            return Err(DomainError::invalid_argument("login name is empty"));
        }
        if password.is_empty() {
            return Err(DomainError::invalid_argument("password is empty"));
        }

        let balance = Balance::new(initial_balance)?;

        Ok(Self {
            id: Uuid::new_v4(),
            login_name,
            account_number: AccountNumber::generate(),
            password,
            balance,
            created_at: Utc::now(),
        })
    }

    /// Rebuild an account from persisted state
    pub fn restore(
        id: Uuid,
        login_name: String,
        account_number: AccountNumber,
        password: String,
        balance: Balance,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            login_name,
            account_number,
            password,
            balance,
            created_at,
        }
    }

    /// Add `amount` to the balance.
    ///
    /// Positivity is guaranteed by `Amount`; the only failure left is the
    /// balance ceiling.
    pub fn deposit(&mut self, amount: &Amount) -> Result<&mut Self, DomainError> {
        self.balance = self.balance.credit(amount)?;
        Ok(self)
    }

    /// Subtract `amount` from the balance.
    ///
    /// The balance is left untouched when the funds are insufficient.
    pub fn withdraw(&mut self, amount: &Amount) -> Result<&mut Self, DomainError> {
        if !self.balance.is_sufficient_for(amount) {
            return Err(DomainError::insufficient_funds(
                amount.value(),
                self.balance.value(),
            ));
        }
        self.balance = self.balance.debit(amount)?;
        Ok(self)
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn login_name(&self) -> &str {
        &self.login_name
    }

    pub fn account_number(&self) -> &AccountNumber {
        &self.account_number
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn balance(&self) -> Balance {
        self.balance
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("login_name", &self.login_name)
            .field("account_number", &self.account_number)
            .field("password", &"<redacted>")
            .field("balance", &self.balance)
            .field("created_at", &self.created_at)
            .finish()
    }
}
