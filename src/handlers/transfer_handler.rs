//! Transfer Coordinator
//!
//! Moves funds between two accounts inside one store transaction.
//!
//! Every transfer locks its two account rows in ascending id order, whatever
//! the direction of the transfer. Two transfers touching the same pair of
//! accounts therefore always request the locks in the same order and can
//! never wait on each other in a cycle.

use std::sync::Arc;

use crate::domain::{Account, Amount, Balance, LedgerError, OperationContext, TransferOutcome};
use crate::store::{run_in_transaction, LedgerStore, LedgerTransaction};

use super::TransferCommand;

/// Order two account ids as `(lower, higher)`.
///
/// `ordered_pair(a, b) == ordered_pair(b, a)` for all ids, which is what makes
/// the lock order independent of transfer direction.
pub fn ordered_pair(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Coordinator for atomic transfers
pub struct TransferCoordinator<S> {
    store: Arc<S>,
}

impl<S> Clone for TransferCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: LedgerStore> TransferCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Execute the transfer command.
    ///
    /// Either the transfer row and both balance writes commit together, or
    /// nothing is written. Store failures are not retried here.
    pub async fn transfer(
        &self,
        command: &TransferCommand,
        context: &OperationContext,
    ) -> Result<TransferOutcome, LedgerError> {
        if command.from_account_id == command.to_account_id {
            return Err(LedgerError::SameAccountTransfer);
        }
        let amount = Amount::new(command.amount)?;

        let from_id = command.from_account_id;
        let to_id = command.to_account_id;

        let result = run_in_transaction(self.store.as_ref(), move |tx| {
            Box::pin(apply_transfer(tx, from_id, to_id, amount))
        })
        .await;

        match &result {
            Ok(outcome) => tracing::info!(
                transfer_id = outcome.transfer.id,
                from_account_id = from_id,
                to_account_id = to_id,
                amount = amount.value(),
                correlation_id = ?context.correlation_id,
                "Transfer committed"
            ),
            Err(e) if e.is_client_error() => tracing::debug!(
                from_account_id = from_id,
                to_account_id = to_id,
                amount = amount.value(),
                correlation_id = ?context.correlation_id,
                "Transfer rejected: {}",
                e
            ),
            Err(e) => tracing::error!(
                from_account_id = from_id,
                to_account_id = to_id,
                amount = amount.value(),
                correlation_id = ?context.correlation_id,
                "Transfer failed: {}",
                e
            ),
        }

        result
    }
}

/// Body of the transfer transaction
async fn apply_transfer<T: LedgerTransaction>(
    tx: &mut T,
    from_id: i64,
    to_id: i64,
    amount: Amount,
) -> Result<TransferOutcome, LedgerError> {
    // The row only becomes visible if the whole transaction commits.
    let transfer = tx.insert_transfer(from_id, to_id, amount.value()).await?;

    let (first_id, second_id) = ordered_pair(from_id, to_id);
    let first = tx.lock_account_for_update(first_id).await?;
    let second = tx.lock_account_for_update(second_id).await?;

    let (mut from_account, mut to_account): (Account, Account) = if first.id == from_id {
        (first, second)
    } else {
        (second, first)
    };

    // Safe to check-then-write: the source row stays locked until commit.
    let available = Balance::new(from_account.balance)?;
    if !available.is_sufficient_for(&amount) {
        return Err(LedgerError::InsufficientFunds {
            account_id: from_id,
            required: amount.value(),
            available: available.value(),
        });
    }

    let debited = available.debit(&amount)?;
    let credited = Balance::new(to_account.balance)?.credit(&amount)?;

    tx.set_account_balance(from_id, debited.value()).await?;
    tx.set_account_balance(to_id, credited.value()).await?;

    from_account.balance = debited.value();
    to_account.balance = credited.value();

    tracing::debug!(
        transfer_id = transfer.id,
        from_balance = from_account.balance,
        to_balance = to_account.balance,
        "Balances updated"
    );

    Ok(TransferOutcome {
        transfer,
        from_account,
        to_account,
    })
}
