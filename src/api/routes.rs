//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::domain::{Account, OperationContext, Transfer, TransferOutcome};
use crate::error::AppError;
use crate::handlers::{CreateAccountCommand, TransferCommand};
use crate::store::{LedgerStore, TransferFilter, MAX_PAGE_SIZE};

use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub balance: i64,
    pub currency: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
    /// Accepted for client compatibility; the ledger does not convert currencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransfersListResponse {
    pub transfers: Vec<Transfer>,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router<S: LedgerStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/accounts", post(create_account::<S>))
        .route("/accounts/:id", get(get_account::<S>))
        .route(
            "/transactions",
            post(create_transfer::<S>).get(list_transfers::<S>),
        )
}

// =========================================================================
// POST /accounts
// =========================================================================

/// Open a new account
async fn create_account<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let command = CreateAccountCommand::new(request.balance, request.currency);
    let account = state.service.create_account(command).await?;

    Ok((StatusCode::CREATED, Json(account)))
}

// =========================================================================
// GET /accounts/:id
// =========================================================================

async fn get_account<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    let account = state.service.get_account(id).await?;
    Ok(Json(account))
}

// =========================================================================
// POST /transactions
// =========================================================================

/// Transfer funds between two accounts
async fn create_transfer<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    context: Option<Extension<OperationContext>>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferOutcome>, AppError> {
    let context = context.map(|Extension(c)| c).unwrap_or_default();

    let command = TransferCommand::new(request.from_account_id, request.to_account_id, request.amount);
    let outcome = state
        .service
        .transfer_with_retry(&command, &state.retry, &context)
        .await?;

    Ok(Json(outcome))
}

// =========================================================================
// GET /transactions
// =========================================================================

/// List committed transfers, optionally for one account
async fn list_transfers<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    Query(filter): Query<TransferFilter>,
) -> Result<Json<TransfersListResponse>, AppError> {
    if filter.limit < 1 || filter.limit > MAX_PAGE_SIZE {
        return Err(AppError::InvalidRequest(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    if filter.offset < 0 {
        return Err(AppError::InvalidRequest("offset must not be negative".to_string()));
    }

    let transfers = state.service.list_transfers(&filter).await?;
    Ok(Json(TransfersListResponse { transfers }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_account_request_deserialize() {
        let json = r#"{ "balance": 1000, "currency": "USD" }"#;
        let request: CreateAccountRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.balance, 1000);
        assert_eq!(request.currency, "USD");
    }

    #[test]
    fn test_transfer_request_deserialize() {
        let json = r#"{
            "from_account_id": 1,
            "to_account_id": 2,
            "amount": 10,
            "currency": "USD"
        }"#;
        let request: TransferRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.from_account_id, 1);
        assert_eq!(request.to_account_id, 2);
        assert_eq!(request.amount, 10);
        assert_eq!(request.currency.as_deref(), Some("USD"));

        let without_currency: TransferRequest =
            serde_json::from_str(r#"{ "from_account_id": 1, "to_account_id": 2, "amount": 10 }"#).unwrap();
        assert!(without_currency.currency.is_none());
    }

    #[test]
    fn test_transfer_filter_defaults() {
        let filter: TransferFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter.limit, 50);
        assert_eq!(filter.offset, 0);
        assert!(filter.account_id.is_none());
    }
}
