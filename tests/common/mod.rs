//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use bank_ledger::{db, AccountRepository, Bank, BankConfig, Config, InMemoryAccountRepository, PgAccountRepository};
use sqlx::PgPool;

/// Bank over a fresh in-memory store
pub fn memory_bank() -> (Bank, Arc<InMemoryAccountRepository>) {
    let repo = Arc::new(InMemoryAccountRepository::new());
    (Bank::new(repo.clone()), repo)
}

/// Bank over an in-memory store that sleeps before every access, so
/// concurrent calls genuinely interleave
pub fn slow_memory_bank(latency: Duration) -> (Bank, Arc<InMemoryAccountRepository>) {
    let repo = Arc::new(InMemoryAccountRepository::new().with_latency(latency));
    let bank = Bank::with_config(
        repo.clone(),
        BankConfig {
            lock_timeout: Duration::from_secs(30),
        },
    );
    (bank, repo)
}

/// Connect to DATABASE_URL, create the schema and empty the table.
///
/// Returns `None` when DATABASE_URL is unset so database tests can skip.
pub async fn setup_test_db() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping database test");
            return None;
        }
    };

    let pool = db::connect(&config).await.expect("Failed to connect to DB");
    db::init_schema(&pool).await.expect("Failed to create schema");

    PgAccountRepository::new(pool.clone())
        .reset_for_testing()
        .await
        .expect("Failed to clean up DB");

    Some(pool)
}
