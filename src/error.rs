//! Error handling module
//!
//! HTTP-facing error type and response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::LedgerError;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::Ledger(err) => match err {
                LedgerError::NotFound { account_id } => {
                    (StatusCode::NOT_FOUND, "account_not_found", Some(account_id.to_string()))
                }
                LedgerError::InsufficientFunds { .. } => {
                    (StatusCode::BAD_REQUEST, "insufficient_funds", Some(err.to_string()))
                }
                LedgerError::InvalidAmount(e) => {
                    (StatusCode::BAD_REQUEST, "invalid_amount", Some(e.to_string()))
                }
                LedgerError::InvalidCurrency(e) => {
                    (StatusCode::BAD_REQUEST, "invalid_currency", Some(e.to_string()))
                }
                LedgerError::SameAccountTransfer => {
                    (StatusCode::BAD_REQUEST, "same_account_transfer", None)
                }
                LedgerError::TransactionFailure(e) => {
                    tracing::error!("Transaction failure: {:?}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "transaction_failed", None)
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = self.parts();

        // Storage details stay in the logs.
        let error = match (&self, status) {
            (AppError::Ledger(_), StatusCode::INTERNAL_SERVER_ERROR) => "Transaction failed".to_string(),
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (AppError::from(LedgerError::NotFound { account_id: 3 }), StatusCode::NOT_FOUND),
            (
                AppError::from(LedgerError::InsufficientFunds {
                    account_id: 1,
                    required: 10,
                    available: 5,
                }),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::from(LedgerError::SameAccountTransfer), StatusCode::BAD_REQUEST),
            (
                AppError::from(LedgerError::from(StoreError::Unavailable("down".to_string()))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AppError::InvalidRequest("bad".to_string()), StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
