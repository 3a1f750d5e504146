//! Ledger Store module
//!
//! Transactional storage of accounts and transfer rows. The store is a
//! capability set: any backend implementing [`LedgerStore`] and
//! [`LedgerTransaction`] can sit under the transfer coordinator.

mod error;
mod memory;
mod postgres;

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{Account, LedgerError, Transfer};

pub use error::StoreError;
pub use memory::{InMemoryLedgerStore, MemoryTransaction};
pub use postgres::{PgLedgerStore, PgLedgerTransaction};

/// Upper bound for one page of transfers
pub const MAX_PAGE_SIZE: i64 = 1000;

fn default_limit() -> i64 {
    50
}

/// Filter for transfer listings
#[derive(Debug, Clone, Deserialize)]
pub struct TransferFilter {
    /// Only transfers where this account is source or destination
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Default for TransferFilter {
    fn default() -> Self {
        Self {
            account_id: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl TransferFilter {
    pub fn for_account(account_id: i64) -> Self {
        Self {
            account_id: Some(account_id),
            ..Self::default()
        }
    }
}

/// Storage backend for the ledger
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Transaction handle produced by [`LedgerStore::begin`]
    type Tx: LedgerTransaction + 'static;

    /// Insert a new account row
    async fn create_account(&self, balance: i64, currency: &str) -> Result<Account, StoreError>;

    /// Read committed account state
    async fn get_account(&self, id: i64) -> Result<Account, StoreError>;

    /// List committed transfers, ascending by id
    async fn list_transfers(&self, filter: &TransferFilter) -> Result<Vec<Transfer>, StoreError>;

    /// Open a transaction. Dropping the handle without commit rolls it back.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// Accessor bound to one open transaction
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Read an account and hold an exclusive row lock until the transaction ends
    async fn lock_account_for_update(&mut self, id: i64) -> Result<Account, StoreError>;

    /// Unconditionally write a balance
    async fn set_account_balance(&mut self, id: i64, balance: i64) -> Result<(), StoreError>;

    /// Insert one immutable transfer row
    async fn insert_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Boxed unit of work executed inside a transaction
pub type TxFuture<'t, T> = Pin<Box<dyn Future<Output = Result<T, LedgerError>> + Send + 't>>;

/// Run `work` inside one transaction.
///
/// Commits when `work` succeeds. On any error from `work` the transaction is
/// rolled back and the error is returned unchanged. A failed commit surfaces
/// as a [`LedgerError::TransactionFailure`].
pub async fn run_in_transaction<S, T, F>(store: &S, work: F) -> Result<T, LedgerError>
where
    S: LedgerStore + ?Sized,
    T: Send,
    F: for<'t> FnOnce(&'t mut S::Tx) -> TxFuture<'t, T> + Send,
{
    let mut tx = store.begin().await.map_err(LedgerError::TransactionFailure)?;

    match work(&mut tx).await {
        Ok(value) => {
            tx.commit().await.map_err(LedgerError::TransactionFailure)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed after: {}", err);
            }
            Err(err)
        }
    }
}
