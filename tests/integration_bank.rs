//! Bank service scenarios against the in-memory repository

use std::sync::Arc;
use std::time::Duration;

use bank_ledger::{AccountRepository, BankError, ErrorKind};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod common;

#[tokio::test]
async fn test_create_deposit_withdraw_transfer_flow() {
    let (bank, _) = common::memory_bank();

    let a = bank.create_account("Customer1", "Password1", dec!(10000)).await.unwrap();
    let b = bank.create_account("Customer2", "Password1", Decimal::ZERO).await.unwrap();

    bank.deposit(Some(&a), dec!(1234.56)).await.unwrap();
    bank.withdraw(Some(&a), dec!(1234.56)).await.unwrap();
    let receipt = bank.transfer(Some(&a), Some(&b), dec!(1234.56)).await.unwrap();

    assert_eq!(receipt.from.balance().value(), dec!(8765.44));
    assert_eq!(receipt.to.balance().value(), dec!(1234.56));

    let total = bank.get_account(a.account_number()).await.unwrap().balance().value()
        + bank.get_account(b.account_number()).await.unwrap().balance().value();
    assert_eq!(total, dec!(10000));
}

#[tokio::test]
async fn test_login_exists_after_creation() {
    let (bank, repo) = common::memory_bank();
    bank.create_account("TestUser1", "Password1", dec!(1000)).await.unwrap();

    assert!(repo.login_exists("TestUser1").await.unwrap());
}

#[tokio::test]
async fn test_cleanup_removes_accounts() {
    let (bank, repo) = common::memory_bank();
    let account = bank.create_account("TestUser1", "Password1", dec!(1000)).await.unwrap();

    repo.reset_for_testing().await.unwrap();

    let err = bank.get_account(account.account_number()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccountNotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_are_not_lost() {
    let (bank, _) = common::slow_memory_bank(Duration::from_millis(1));
    let account = bank.create_account("Customer1", "Password1", dec!(5000)).await.unwrap();

    let amounts: Vec<Decimal> = {
        let mut rng = rand::thread_rng();
        (0..50)
            .map(|_| Decimal::new(rng.gen_range(1..100_000), 2))
            .collect()
    };
    let expected = dec!(5000) + amounts.iter().copied().sum::<Decimal>();

    let mut handles = Vec::new();
    for amount in amounts {
        let bank = bank.clone();
        let account = account.clone();
        handles.push(tokio::spawn(async move {
            bank.deposit(Some(&account), amount).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let balance = bank.get_account(account.account_number()).await.unwrap().balance().value();
    assert_eq!(balance, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_concurrent_operations_on_one_pair() {
    let (bank, _) = common::slow_memory_bank(Duration::from_millis(1));
    let a = bank.create_account("Customer1", "Password1", dec!(5000)).await.unwrap();
    let b = bank.create_account("Customer1101", "Password1", Decimal::ZERO).await.unwrap();

    let deposit = {
        let (bank, a) = (bank.clone(), a.clone());
        tokio::spawn(async move { bank.deposit(Some(&a), dec!(1000)).await.map(|_| ()) })
    };
    let withdraw = {
        let (bank, a) = (bank.clone(), a.clone());
        tokio::spawn(async move { bank.withdraw(Some(&a), dec!(1000)).await.map(|_| ()) })
    };
    let forward = {
        let (bank, a, b) = (bank.clone(), a.clone(), b.clone());
        tokio::spawn(async move { bank.transfer(Some(&a), Some(&b), dec!(1000)).await.map(|_| ()) })
    };
    let backward = {
        let (bank, a, b) = (bank.clone(), a.clone(), b.clone());
        tokio::spawn(async move { bank.transfer(Some(&b), Some(&a), dec!(500)).await.map(|_| ()) })
    };

    // The reverse transfer may run before b has funds; every other call must succeed.
    deposit.await.unwrap().unwrap();
    withdraw.await.unwrap().unwrap();
    forward.await.unwrap().unwrap();
    let backward_ok = match backward.await.unwrap() {
        Ok(()) => true,
        Err(BankError::InsufficientFunds { .. }) => false,
        Err(e) => panic!("unexpected error: {}", e),
    };

    let balance_a = bank.get_account(a.account_number()).await.unwrap().balance().value();
    let balance_b = bank.get_account(b.account_number()).await.unwrap().balance().value();

    assert_eq!(balance_a + balance_b, dec!(5000));
    if backward_ok {
        assert_eq!(balance_a, dec!(4500));
        assert_eq!(balance_b, dec!(500));
    } else {
        assert_eq!(balance_a, dec!(4000));
        assert_eq!(balance_b, dec!(1000));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposing_transfers_conserve_total() {
    let (bank, _) = common::slow_memory_bank(Duration::from_millis(1));
    let a = bank.create_account("Alice", "pw", dec!(1000)).await.unwrap();
    let b = bank.create_account("Bob", "pw", dec!(1000)).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..40 {
        let (bank, a, b) = (bank.clone(), a.clone(), b.clone());
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                bank.transfer(Some(&a), Some(&b), dec!(10)).await
            } else {
                bank.transfer(Some(&b), Some(&a), dec!(10)).await
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let balance_a = bank.get_account(a.account_number()).await.unwrap().balance().value();
    let balance_b = bank.get_account(b.account_number()).await.unwrap().balance().value();
    assert_eq!(balance_a, dec!(1000));
    assert_eq!(balance_b, dec!(1000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() {
    let (bank, _) = common::slow_memory_bank(Duration::from_millis(1));
    let account = bank.create_account("Customer1", "Password1", dec!(100)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let (bank, account) = (bank.clone(), account.clone());
        handles.push(tokio::spawn(async move {
            bank.withdraw(Some(&account), dec!(30)).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::InsufficientFunds),
        }
    }

    let balance = bank.get_account(account.account_number()).await.unwrap().balance().value();
    assert_eq!(succeeded, 3);
    assert_eq!(balance, dec!(10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creation_with_same_login() {
    let (bank, repo) = common::slow_memory_bank(Duration::from_millis(2));

    let mut handles = Vec::new();
    for i in 0..8 {
        let bank = bank.clone();
        handles.push(tokio::spawn(async move {
            bank.create_account("SameName", &format!("pw{}", i), Decimal::ZERO).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::DuplicateLogin),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(repo.len().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unserialized_read_modify_write_loses_updates() {
    // Same store, bypassing the bank: this is what the lock manager prevents.
    let repo = Arc::new(
        bank_ledger::InMemoryAccountRepository::new().with_latency(Duration::from_millis(5)),
    );
    let account = bank_ledger::Account::new("Customer1", "Password1", Decimal::ZERO).unwrap();
    repo.create(&account).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let (repo, number) = (repo.clone(), account.account_number().clone());
        handles.push(tokio::spawn(async move {
            let mut current = repo.get(&number).await.unwrap().unwrap();
            current.deposit(&bank_ledger::Amount::from_integer(1).unwrap()).unwrap();
            repo.update(&current).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let balance = repo.get(account.account_number()).await.unwrap().unwrap().balance().value();
    assert!(balance < dec!(10), "expected lost updates, got {}", balance);
}
