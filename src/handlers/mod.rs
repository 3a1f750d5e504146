//! Ledger handlers module
//!
//! The transfer coordinator, the account service in front of it, and the
//! commands they accept.

mod account_service;
mod commands;
mod retry;
mod transfer_handler;


pub use account_service::AccountService;
pub use commands::*;
pub use retry::RetryPolicy;
pub use transfer_handler::{ordered_pair, TransferCoordinator};
