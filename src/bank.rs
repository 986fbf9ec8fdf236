//! Bank service
//!
//! Orchestrates account creation and balance mutation. Every mutation is a
//! fetch-mutate-persist cycle run while holding the lock of each account it
//! touches, so concurrent calls on one account are applied one after the
//! other instead of overwriting each other.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::Config;
use crate::domain::{Account, AccountNumber, Amount, DomainError};
use crate::error::{BankError, BankResult};
use crate::lock::{AccountLockGuard, AccountLocks, LockKey};
use crate::repository::{AccountRepository, RepositoryError};

/// Default wait for account locks
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Bank service settings
#[derive(Debug, Clone)]
pub struct BankConfig {
    /// How long an operation waits for its locks before failing with `Timeout`
    pub lock_timeout: Duration,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl From<&Config> for BankConfig {
    fn from(config: &Config) -> Self {
        Self {
            lock_timeout: config.lock_timeout,
        }
    }
}

/// Both committed sides of a transfer
#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    pub from: Account,
    pub to: Account,
    pub amount: Decimal,
}

/// The ledger service. Cheap to clone; clones share the lock table.
#[derive(Clone)]
pub struct Bank {
    repository: Arc<dyn AccountRepository>,
    locks: AccountLocks,
    config: BankConfig,
}

impl Bank {
    pub fn new(repository: Arc<dyn AccountRepository>) -> Self {
        Self::with_config(repository, BankConfig::default())
    }

    pub fn with_config(repository: Arc<dyn AccountRepository>, config: BankConfig) -> Self {
        Self {
            repository,
            locks: AccountLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    // =========================================================================
    // Account creation
    // =========================================================================

    /// Open a new account.
    ///
    /// The login name is reserved for the duration of the check-and-create,
    /// and the store's unique constraint backs that up across processes.
    pub async fn create_account(
        &self,
        login_name: &str,
        password: &str,
        initial_deposit: Decimal,
    ) -> BankResult<Account> {
        let account = Account::new(login_name, password, initial_deposit)?;

        let _guard = self.lock([LockKey::Login(login_name.to_string())]).await?;

        if self.repository.login_exists(login_name).await? {
            tracing::warn!(login_name, "Rejected duplicate login name");
            return Err(BankError::DuplicateLogin(login_name.to_string()));
        }

        let created = self
            .repository
            .create(&account)
            .await
            .map_err(|e| match e {
                RepositoryError::DuplicateKey(ref key) if key == login_name => {
                    BankError::DuplicateLogin(login_name.to_string())
                }
                other => other.into(),
            })?;

        tracing::info!(
            account_number = %created.account_number(),
            login_name,
            balance = %created.balance(),
            "Account created"
        );
        Ok(created)
    }

    /// Current persisted state of an account
    pub async fn get_account(&self, account_number: &AccountNumber) -> BankResult<Account> {
        self.fetch(account_number).await
    }

    // =========================================================================
    // Balance mutation
    // =========================================================================

    /// Add `amount` to the persisted balance of `account`.
    pub async fn deposit(&self, account: Option<&Account>, amount: Decimal) -> BankResult<Account> {
        let account = account.ok_or(BankError::NullAccount("Target"))?;
        let amount = validate_amount(amount)?;
        let number = account.account_number();

        let _guard = self.lock([LockKey::Account(number.clone())]).await?;

        let mut current = self.fetch(number).await?;
        current.deposit(&amount)?;
        self.repository.update(&current).await?;

        tracing::info!(
            account_number = %number,
            amount = %amount,
            balance = %current.balance(),
            "Deposit committed"
        );
        Ok(current)
    }

    /// Take `amount` from the persisted balance of `account`.
    ///
    /// Fails with `InsufficientFunds` and writes nothing when the balance is
    /// smaller than `amount`.
    pub async fn withdraw(&self, account: Option<&Account>, amount: Decimal) -> BankResult<Account> {
        let account = account.ok_or(BankError::NullAccount("Source"))?;
        let amount = validate_amount(amount)?;
        let number = account.account_number();

        let _guard = self.lock([LockKey::Account(number.clone())]).await?;

        let mut current = self.fetch(number).await?;
        if let Err(e) = current.withdraw(&amount) {
            tracing::warn!(account_number = %number, amount = %amount, "Withdrawal rejected: {}", e);
            return Err(e.into());
        }
        self.repository.update(&current).await?;

        tracing::info!(
            account_number = %number,
            amount = %amount,
            balance = %current.balance(),
            "Withdrawal committed"
        );
        Ok(current)
    }

    /// Move `amount` from one account to another.
    ///
    /// Both balances are re-read under lock; the passed accounts only name
    /// which rows to touch. The withdrawal side is checked first, and if it
    /// fails nothing is mutated or written.
    pub async fn transfer(
        &self,
        from: Option<&Account>,
        to: Option<&Account>,
        amount: Decimal,
    ) -> BankResult<TransferReceipt> {
        let from = from.ok_or(BankError::NullAccount("Source"))?;
        let to = to.ok_or(BankError::NullAccount("Destination"))?;
        let amount = validate_amount(amount)?;

        let from_number = from.account_number();
        let to_number = to.account_number();
        if from_number == to_number {
            return Err(BankError::InvalidArgument(
                "cannot transfer to the same account".to_string(),
            ));
        }

        let _guard = self
            .lock([
                LockKey::Account(from_number.clone()),
                LockKey::Account(to_number.clone()),
            ])
            .await?;

        let mut sender = self.fetch(from_number).await?;
        let mut receiver = self.fetch(to_number).await?;

        if let Err(e) = sender.withdraw(&amount) {
            tracing::warn!(
                from = %from_number,
                to = %to_number,
                amount = %amount,
                "Transfer rejected: {}",
                e
            );
            return Err(e.into());
        }
        receiver.deposit(&amount)?;

        self.repository.transfer(&sender, &receiver).await?;

        tracing::info!(
            from = %from_number,
            to = %to_number,
            amount = %amount,
            "Transfer committed"
        );
        Ok(TransferReceipt {
            from: sender,
            to: receiver,
            amount: amount.value(),
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn lock<const N: usize>(&self, keys: [LockKey; N]) -> BankResult<AccountLockGuard> {
        Ok(self.locks.acquire(keys, self.config.lock_timeout).await?)
    }

    async fn fetch(&self, account_number: &AccountNumber) -> BankResult<Account> {
        self.repository
            .get(account_number)
            .await?
            .ok_or_else(|| BankError::AccountNotFound(account_number.to_string()))
    }
}

fn validate_amount(amount: Decimal) -> Result<Amount, DomainError> {
    Amount::new(amount).map_err(DomainError::from)
}
