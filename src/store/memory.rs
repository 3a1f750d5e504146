//! In-memory ledger store
//!
//! Behaves like the Postgres store where the transfer protocol can tell the
//! difference: each account row has its own async mutex standing in for the
//! row lock, writes are buffered in the transaction and applied on commit,
//! and dropping a transaction discards its writes and releases its locks.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use crate::domain::{Account, Transfer};

use super::{LedgerStore, LedgerTransaction, StoreError, TransferFilter, MAX_PAGE_SIZE};

#[derive(Debug, Default)]
struct Committed {
    accounts: BTreeMap<i64, Account>,
    transfers: BTreeMap<i64, Transfer>,
}

#[derive(Debug)]
struct Shared {
    committed: Mutex<Committed>,
    row_locks: Mutex<HashMap<i64, Arc<RowLock<()>>>>,
    next_account_id: AtomicI64,
    next_transfer_id: AtomicI64,
    fail_next_commit: AtomicBool,
}

impl Shared {
    fn committed(&self) -> Result<MutexGuard<'_, Committed>, StoreError> {
        self.committed
            .lock()
            .map_err(|_| StoreError::Unavailable("ledger state lock poisoned".to_string()))
    }

    fn row_lock(&self, id: i64) -> Result<Arc<RowLock<()>>, StoreError> {
        let mut locks = self
            .row_locks
            .lock()
            .map_err(|_| StoreError::Unavailable("row lock table poisoned".to_string()))?;
        Ok(locks.entry(id).or_default().clone())
    }

    fn account_exists(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.committed()?.accounts.contains_key(&id))
    }
}

/// Ledger store kept in process memory. Cloning shares the same ledger.
#[derive(Debug, Clone)]
pub struct InMemoryLedgerStore {
    shared: Arc<Shared>,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                committed: Mutex::new(Committed::default()),
                row_locks: Mutex::new(HashMap::new()),
                next_account_id: AtomicI64::new(1),
                next_transfer_id: AtomicI64::new(1),
                fail_next_commit: AtomicBool::new(false),
            }),
        }
    }

    /// Make the next commit fail as if the connection dropped mid-commit
    pub fn fail_next_commit(&self) {
        self.shared.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of committed transfer rows
    pub fn transfer_count(&self) -> Result<usize, StoreError> {
        Ok(self.shared.committed()?.transfers.len())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Tx = MemoryTransaction;

    async fn create_account(&self, balance: i64, currency: &str) -> Result<Account, StoreError> {
        let account = Account {
            id: self.shared.next_account_id.fetch_add(1, Ordering::SeqCst),
            balance,
            currency: currency.to_string(),
            created_at: Utc::now(),
        };
        self.shared
            .committed()?
            .accounts
            .insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: i64) -> Result<Account, StoreError> {
        self.shared
            .committed()?
            .accounts
            .get(&id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(id))
    }

    async fn list_transfers(&self, filter: &TransferFilter) -> Result<Vec<Transfer>, StoreError> {
        let limit = filter.limit.clamp(0, MAX_PAGE_SIZE) as usize;
        let offset = filter.offset.max(0) as usize;

        let committed = self.shared.committed()?;
        Ok(committed
            .transfers
            .values()
            .filter(|t| match filter.account_id {
                Some(id) => t.from_account_id == id || t.to_account_id == id,
                None => true,
            })
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(MemoryTransaction {
            shared: self.shared.clone(),
            held: HashMap::new(),
            pending_balances: BTreeMap::new(),
            pending_transfers: Vec::new(),
        })
    }
}

/// Open in-memory transaction
pub struct MemoryTransaction {
    shared: Arc<Shared>,
    held: HashMap<i64, OwnedMutexGuard<()>>,
    pending_balances: BTreeMap<i64, i64>,
    pending_transfers: Vec<Transfer>,
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn lock_account_for_update(&mut self, id: i64) -> Result<Account, StoreError> {
        // Accounts are never deleted, so a row missing now stays missing.
        if !self.shared.account_exists(id)? {
            return Err(StoreError::AccountNotFound(id));
        }

        if !self.held.contains_key(&id) {
            let lock = self.shared.row_lock(id)?;
            let guard = lock.lock_owned().await;
            self.held.insert(id, guard);
        }

        let mut account = self
            .shared
            .committed()?
            .accounts
            .get(&id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(id))?;
        if let Some(balance) = self.pending_balances.get(&id) {
            account.balance = *balance;
        }
        Ok(account)
    }

    async fn set_account_balance(&mut self, id: i64, balance: i64) -> Result<(), StoreError> {
        // An UPDATE locks the row it touches.
        self.lock_account_for_update(id).await?;
        self.pending_balances.insert(id, balance);
        Ok(())
    }

    async fn insert_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        for id in [from_account_id, to_account_id] {
            if !self.shared.account_exists(id)? {
                return Err(StoreError::AccountNotFound(id));
            }
        }

        let transfer = Transfer {
            id: self.shared.next_transfer_id.fetch_add(1, Ordering::SeqCst),
            from_account_id,
            to_account_id,
            amount,
            created_at: Utc::now(),
        };
        self.pending_transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn commit(self) -> Result<(), StoreError> {
        if self.shared.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("commit failed".to_string()));
        }

        let mut committed = self.shared.committed()?;
        for (id, balance) in &self.pending_balances {
            if let Some(account) = committed.accounts.get_mut(id) {
                account.balance = *balance;
            }
        }
        committed
            .transfers
            .extend(self.pending_transfers.iter().map(|t| (t.id, t.clone())));
        drop(committed);

        // Row locks are released when `self.held` drops here.
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
