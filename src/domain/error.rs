//! Ledger Error Types
//!
//! Errors surfaced by the transfer coordinator and the account service.

use thiserror::Error;

use crate::store::StoreError;

use super::{AmountError, CurrencyError};

/// Errors a caller of the ledger can observe.
///
/// `NotFound` and `InsufficientFunds` are reportable conditions that need a
/// corrected request. `TransactionFailure` wraps storage problems and may be
/// transient; the whole transfer is safe to re-issue because a failed attempt
/// leaves nothing behind.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Referenced account does not exist
    #[error("Account not found: {account_id}")]
    NotFound { account_id: i64 },

    /// Source balance below the requested amount at check time
    #[error("Insufficient funds in account {account_id}: required {required}, available {available}")]
    InsufficientFunds {
        account_id: i64,
        required: i64,
        available: i64,
    },

    /// Invalid amount or balance (zero, negative, or overflowing)
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("Invalid currency: {0}")]
    InvalidCurrency(#[from] CurrencyError),

    /// Transfer to same account
    #[error("Cannot transfer to the same account")]
    SameAccountTransfer,

    /// Storage, connectivity or commit failure
    #[error("Transaction failed: {0}")]
    TransactionFailure(#[source] StoreError),
}

impl LedgerError {
    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::TransactionFailure(_))
    }

    /// Check if re-issuing the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransactionFailure(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(account_id) => Self::NotFound { account_id },
            other => Self::TransactionFailure(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err: LedgerError = StoreError::AccountNotFound(999).into();
        assert!(matches!(err, LedgerError::NotFound { account_id: 999 }));
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_store_failure_maps_to_transaction_failure() {
        let err: LedgerError = StoreError::Unavailable("connection reset".to_string()).into();
        assert!(matches!(err, LedgerError::TransactionFailure(_)));
        assert!(!err.is_client_error());
        assert!(err.is_retryable());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = LedgerError::InsufficientFunds {
            account_id: 7,
            required: 10,
            available: 5,
        };
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("required 10"));
        assert!(err.to_string().contains("available 5"));
    }
}
