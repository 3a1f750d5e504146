//! Ledger service library
//!
//! Accounts, atomic transfers between them, and the HTTP API in front.
//! Re-exports modules for integration testing and the server binary.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod handlers;
pub mod store;

pub use config::Config;
pub use domain::{Account, Amount, Balance, Currency, LedgerError, OperationContext, Transfer, TransferOutcome};
pub use error::{AppError, ErrorResponse};
