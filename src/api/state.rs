//! Shared router state

use crate::handlers::{AccountService, RetryPolicy};
use crate::store::LedgerStore;

/// State handed to every route
pub struct AppState<S> {
    pub service: AccountService<S>,
    /// Caller-level retry applied to `POST /transactions`
    pub retry: RetryPolicy,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            retry: self.retry,
        }
    }
}

impl<S: LedgerStore> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            service: AccountService::new(store),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
