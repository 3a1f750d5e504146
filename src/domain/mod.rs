//! Domain module
//!
//! Core ledger types: validated money primitives, records and errors.

pub mod amount;
pub mod context;
pub mod currency;
pub mod error;
pub mod models;

pub use amount::{Amount, AmountError, Balance};
pub use context::OperationContext;
pub use currency::{Currency, CurrencyError};
pub use error::LedgerError;
pub use models::{Account, Transfer, TransferOutcome};
