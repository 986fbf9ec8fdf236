//! Postgres account repository
//!
//! Every statement binds its parameters. Writes that touch more than one
//! row run inside a single transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::{Account, AccountNumber, Balance};

use super::{AccountRepository, RepositoryError};

/// Account repository backed by the `accounts` table
#[derive(Debug, Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Create a new repository with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Write a balance inside `tx`, failing if the row is gone
    async fn update_balance(
        tx: &mut Transaction<'_, Postgres>,
        account: &Account,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET balance = $1 WHERE account_number = $2
            "#,
        )
        .bind(account.balance().value())
        .bind(account.account_number().as_str())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(
                account.account_number().to_string(),
            ));
        }
        Ok(())
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, RepositoryError> {
    let id: Uuid = row.try_get("id")?;
    let login_name: String = row.try_get("login_name")?;
    let account_number: String = row.try_get("account_number")?;
    let password: String = row.try_get("password")?;
    let balance: Decimal = row.try_get("balance")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    let balance = Balance::new(balance)
        .map_err(|e| RepositoryError::CorruptRow(format!("{}: {}", account_number, e)))?;

    Ok(Account::restore(
        id,
        login_name,
        AccountNumber::from(account_number),
        password,
        balance,
        created_at,
    ))
}

/// Name of the unique constraint on `accounts.account_number`
const ACCOUNT_NUMBER_CONSTRAINT: &str = "accounts_account_number_key";

/// Report a unique violation under the value that collided
fn map_unique_violation(err: sqlx::Error, account: &Account) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            let key = if db_err.constraint() == Some(ACCOUNT_NUMBER_CONSTRAINT) {
                account.account_number().as_str()
            } else {
                account.login_name()
            };
            RepositoryError::DuplicateKey(key.to_string())
        }
        _ => RepositoryError::Database(err),
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn create(&self, account: &Account) -> Result<Account, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, login_name, account_number, password, balance, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(account.id())
        .bind(account.login_name())
        .bind(account.account_number().as_str())
        .bind(account.password())
        .bind(account.balance().value())
        .bind(account.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, account))?;

        Ok(account.clone())
    }

    async fn get(&self, account_number: &AccountNumber) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, login_name, account_number, password, balance, created_at
            FROM accounts
            WHERE account_number = $1
            "#,
        )
        .bind(account_number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn update(&self, account: &Account) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        Self::update_balance(&mut tx, account).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, account_number: &AccountNumber) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM accounts WHERE account_number = $1")
            .bind(account_number.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn transfer(&self, from: &Account, to: &Account) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Dropping tx on error rolls back the first update
        Self::update_balance(&mut tx, from).await?;
        Self::update_balance(&mut tx, to).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn login_exists(&self, login_name: &str) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM accounts WHERE login_name = $1)",
        )
        .bind(login_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn reset_for_testing(&self) -> Result<(), RepositoryError> {
        sqlx::query("TRUNCATE TABLE accounts")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
