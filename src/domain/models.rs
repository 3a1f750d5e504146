//! Ledger records
//!
//! Row shapes shared by every store backend and returned through the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A monetary account. `balance` is in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub balance: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// A committed movement of funds. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transfer {
    pub id: i64,
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Result of a committed transfer: the transfer row plus the post-transfer
/// state of both accounts. Derived for display only, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
}
