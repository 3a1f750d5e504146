//! Command definitions
//!
//! Commands represent intentions to change the ledger.

/// Command to open a new account
#[derive(Debug, Clone)]
pub struct CreateAccountCommand {
    /// Opening balance in minor units
    pub balance: i64,
    /// Three-letter currency code
    pub currency: String,
}

impl CreateAccountCommand {
    pub fn new(balance: i64, currency: impl Into<String>) -> Self {
        Self {
            balance,
            currency: currency.into(),
        }
    }
}

/// Command to move funds between two accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCommand {
    pub from_account_id: i64,
    pub to_account_id: i64,
    /// Amount in minor units
    pub amount: i64,
}

impl TransferCommand {
    pub fn new(from_account_id: i64, to_account_id: i64, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }
}
