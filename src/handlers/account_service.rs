//! Account Service
//!
//! Façade over the ledger store and the transfer coordinator.

use std::sync::Arc;

use crate::domain::{
    Account, Balance, Currency, LedgerError, OperationContext, Transfer, TransferOutcome,
};
use crate::store::{LedgerStore, TransferFilter};

use super::{CreateAccountCommand, RetryPolicy, TransferCommand, TransferCoordinator};

/// Entry point for callers of the ledger
pub struct AccountService<S> {
    store: Arc<S>,
    coordinator: TransferCoordinator<S>,
}

impl<S> Clone for AccountService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<S: LedgerStore> AccountService<S> {
    pub fn new(store: S) -> Self {
        let store = Arc::new(store);
        Self {
            coordinator: TransferCoordinator::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open an account with a non-negative balance
    pub async fn create_account(&self, command: CreateAccountCommand) -> Result<Account, LedgerError> {
        let balance = Balance::new(command.balance)?;
        let currency = Currency::new(&command.currency)?;

        let account = self
            .store
            .create_account(balance.value(), currency.as_str())
            .await?;

        tracing::info!(
            account_id = account.id,
            balance = account.balance,
            currency = %account.currency,
            "Account created"
        );

        Ok(account)
    }

    pub async fn get_account(&self, id: i64) -> Result<Account, LedgerError> {
        Ok(self.store.get_account(id).await?)
    }

    pub async fn list_transfers(&self, filter: &TransferFilter) -> Result<Vec<Transfer>, LedgerError> {
        Ok(self.store.list_transfers(filter).await?)
    }

    /// Single transfer attempt
    pub async fn transfer(
        &self,
        command: &TransferCommand,
        context: &OperationContext,
    ) -> Result<TransferOutcome, LedgerError> {
        self.coordinator.transfer(command, context).await
    }

    /// Re-issue the whole transfer while it fails with a retryable error
    pub async fn transfer_with_retry(
        &self,
        command: &TransferCommand,
        policy: &RetryPolicy,
        context: &OperationContext,
    ) -> Result<TransferOutcome, LedgerError> {
        let mut attempt = 1;
        loop {
            match self.transfer(command, context).await {
                Err(e) if e.is_retryable() && policy.should_retry(attempt) => {
                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        correlation_id = ?context.correlation_id,
                        "Transfer failed, retrying (attempt {}/{}): {}",
                        attempt + 1,
                        policy.max_attempts,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
