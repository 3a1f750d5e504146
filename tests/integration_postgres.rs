//! Transfer tests against a live Postgres.
//!
//! Each test returns early when `DATABASE_URL` is unset or unreachable.

use std::sync::Arc;

use ledger_service::domain::{LedgerError, OperationContext};
use ledger_service::handlers::{AccountService, CreateAccountCommand, TransferCommand};
use ledger_service::store::{PgLedgerStore, TransferFilter};

mod common;

async fn service() -> Option<(AccountService<PgLedgerStore>, sqlx::PgPool)> {
    let pool = common::setup_test_db().await?;
    Some((AccountService::new(PgLedgerStore::new(pool.clone())), pool))
}

async fn open(service: &AccountService<PgLedgerStore>, balance: i64) -> i64 {
    service
        .create_account(CreateAccountCommand::new(balance, "USD".to_string()))
        .await
        .expect("Failed to create account")
        .id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_pg() {
    let Some((service, _pool)) = service().await else {
        return;
    };
    let a = open(&service, 1000).await;
    let b = open(&service, 1000).await;

    let n = 10;
    let amount = 10;
    let service = Arc::new(service);
    let mut handles = Vec::new();
    for _ in 0..n {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .transfer(&TransferCommand::new(a, b, amount), &OperationContext::new())
                .await
        }));
    }
    for handle in handles {
        let outcome = handle.await.unwrap().expect("Transfer failed");
        assert_eq!(outcome.from_account.id, a);
        assert_eq!(outcome.to_account.id, b);
        assert_eq!(outcome.transfer.from_account_id, a);
        assert_eq!(outcome.transfer.to_account_id, b);
        assert_eq!(outcome.transfer.amount, amount);
        assert!(outcome.transfer.id > 0);
    }

    assert_eq!(service.get_account(a).await.unwrap().balance, 1000 - n * amount);
    assert_eq!(service.get_account(b).await.unwrap().balance, 1000 + n * amount);

    let transfers = service
        .list_transfers(&TransferFilter::for_account(a))
        .await
        .unwrap();
    assert_eq!(transfers.len(), n as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposite_direction_transfers_pg() {
    let Some((service, _pool)) = service().await else {
        return;
    };
    let a = open(&service, 500).await;
    let b = open(&service, 500).await;

    let service = Arc::new(service);
    let mut handles = Vec::new();
    for i in 0..20 {
        let service = service.clone();
        let command = if i % 2 == 0 {
            TransferCommand::new(a, b, 7)
        } else {
            TransferCommand::new(b, a, 7)
        };
        handles.push(tokio::spawn(async move {
            service.transfer(&command, &OperationContext::new()).await
        }));
    }

    let joined = tokio::time::timeout(std::time::Duration::from_secs(30), async {
        for handle in handles {
            handle.await.unwrap().expect("Transfer failed");
        }
    })
    .await;
    assert!(joined.is_ok(), "transfers did not finish");

    let total = service.get_account(a).await.unwrap().balance + service.get_account(b).await.unwrap().balance;
    assert_eq!(total, 1000);
}

#[tokio::test]
async fn test_insufficient_funds_pg() {
    let Some((service, _pool)) = service().await else {
        return;
    };
    let a = open(&service, 20).await;
    let b = open(&service, 0).await;

    let err = service
        .transfer(&TransferCommand::new(a, b, 30), &OperationContext::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds { account_id, required: 30, available: 20 } if account_id == a
    ));

    assert_eq!(service.get_account(a).await.unwrap().balance, 20);
    assert_eq!(service.get_account(b).await.unwrap().balance, 0);
    let transfers = service
        .list_transfers(&TransferFilter::for_account(a))
        .await
        .unwrap();
    assert!(transfers.is_empty());
}

#[tokio::test]
async fn test_missing_account_pg() {
    let Some((service, pool)) = service().await else {
        return;
    };
    let a = open(&service, 50).await;
    let missing = common::unused_account_id(&pool).await;

    let err = service
        .transfer(&TransferCommand::new(a, missing, 10), &OperationContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { account_id } if account_id == missing));

    let err = service
        .transfer(&TransferCommand::new(missing, a, 10), &OperationContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { account_id } if account_id == missing));

    assert!(matches!(
        service.get_account(missing).await,
        Err(LedgerError::NotFound { .. })
    ));
    assert_eq!(service.get_account(a).await.unwrap().balance, 50);
}
