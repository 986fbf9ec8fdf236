//! In-memory account repository
//!
//! Behaves like the Postgres store (unique account numbers and login names,
//! atomic two-row transfer) without needing a database. An optional delay
//! before every read and write widens the window between fetch and persist,
//! which makes lost updates reproducible in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Account, AccountNumber};

use super::{AccountRepository, RepositoryError};

#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<AccountNumber, Account>>,
    latency: Option<Duration>,
    writes: AtomicUsize,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` before every storage access
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of successful create/update/transfer calls so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn create(&self, account: &Account) -> Result<Account, RepositoryError> {
        self.simulate_latency().await;
        let mut accounts = self.accounts.write().await;

        if accounts.contains_key(account.account_number()) {
            return Err(RepositoryError::DuplicateKey(
                account.account_number().to_string(),
            ));
        }
        if accounts
            .values()
            .any(|existing| existing.login_name() == account.login_name())
        {
            return Err(RepositoryError::DuplicateKey(account.login_name().to_string()));
        }

        accounts.insert(account.account_number().clone(), account.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(account.clone())
    }

    async fn get(&self, account_number: &AccountNumber) -> Result<Option<Account>, RepositoryError> {
        self.simulate_latency().await;
        Ok(self.accounts.read().await.get(account_number).cloned())
    }

    async fn update(&self, account: &Account) -> Result<(), RepositoryError> {
        self.simulate_latency().await;
        let mut accounts = self.accounts.write().await;

        let stored = accounts
            .get_mut(account.account_number())
            .ok_or_else(|| RepositoryError::NotFound(account.account_number().to_string()))?;
        *stored = account.clone();

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, account_number: &AccountNumber) -> Result<(), RepositoryError> {
        self.simulate_latency().await;
        self.accounts.write().await.remove(account_number);
        Ok(())
    }

    async fn transfer(&self, from: &Account, to: &Account) -> Result<(), RepositoryError> {
        self.simulate_latency().await;
        let mut accounts = self.accounts.write().await;

        for side in [from, to] {
            if !accounts.contains_key(side.account_number()) {
                return Err(RepositoryError::NotFound(side.account_number().to_string()));
            }
        }
        accounts.insert(from.account_number().clone(), from.clone());
        accounts.insert(to.account_number().clone(), to.clone());

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn login_exists(&self, login_name: &str) -> Result<bool, RepositoryError> {
        self.simulate_latency().await;
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .any(|account| account.login_name() == login_name))
    }

    async fn reset_for_testing(&self) -> Result<(), RepositoryError> {
        self.accounts.write().await.clear();
        Ok(())
    }
}
