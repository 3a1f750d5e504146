//! Amount and Balance types
//!
//! Domain primitives for monetary values in minor currency units (cents).
//! All values are validated at construction time, so an invalid amount or a
//! negative balance cannot exist in a computation.

/// Amount represents a validated transfer amount in minor units.
///
/// # Invariants
/// - Value is always positive (> 0)
///
/// # Example
/// ```
/// use ledger_service::domain::Amount;
///
/// let amount = Amount::new(250).unwrap();
/// assert_eq!(amount.value(), 250);
/// assert!(Amount::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

/// Errors that can occur when creating an Amount or adjusting a Balance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(i64),

    #[error("Balance cannot be negative (got {0})")]
    NegativeBalance(i64),

    #[error("Balance of {balance} cannot cover {amount}")]
    Insufficient { balance: i64, amount: i64 },

    #[error("Balance would exceed the maximum representable value")]
    Overflow,
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    pub fn new(value: i64) -> Result<Self, AmountError> {
        if value <= 0 {
            return Err(AmountError::NotPositive(value));
        }
        Ok(Self(value))
    }

    /// Get the underlying value in minor units.
    pub fn value(&self) -> i64 {
        self.0
    }
}

/// Balance represents an account balance (zero or positive).
/// Unlike Amount, Balance can be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Balance(i64);

impl Balance {
    /// Create a new balance (zero or positive)
    pub fn new(value: i64) -> Result<Self, AmountError> {
        if value < 0 {
            return Err(AmountError::NegativeBalance(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Check if balance is sufficient for withdrawal
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add amount to balance
    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        self.0
            .checked_add(amount.value())
            .map(Balance)
            .ok_or(AmountError::Overflow)
    }

    /// Subtract amount from balance
    pub fn debit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        if !self.is_sufficient_for(amount) {
            return Err(AmountError::Insufficient {
                balance: self.0,
                amount: amount.value(),
            });
        }
        Ok(Balance(self.0 - amount.value()))
    }
}
