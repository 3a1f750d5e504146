//! Common test utilities

#![allow(dead_code)]

use axum::{middleware, Router};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

use ledger_service::api::{self, middleware::context_middleware, AppState};
use ledger_service::store::{InMemoryLedgerStore, LedgerStore};

const SCHEMA: &str = include_str!("../../migrations/0001_create_ledger.sql");

/// Serializes schema creation across concurrently starting tests
const SCHEMA_LOCK_KEY: i64 = 0x1ed9e5;

/// Connect to the test database and make sure the schema exists.
///
/// Returns `None` when `DATABASE_URL` is unset or the server is unreachable,
/// so callers can skip instead of failing on machines without Postgres.
pub async fn setup_test_db() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;

    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(std::time::Duration::from_secs(3))
        .connect(&database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("skipping: cannot connect to {}: {}", database_url, e);
            return None;
        }
    };

    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await
        .expect("Failed to take schema lock");
    (&mut *tx)
        .execute(SCHEMA)
        .await
        .expect("Failed to apply schema");
    tx.commit().await.expect("Failed to commit schema");

    Some(pool)
}

/// An id no account row uses yet
pub async fn unused_account_id(pool: &PgPool) -> i64 {
    let max: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM accounts")
        .fetch_one(pool)
        .await
        .expect("Failed to read max account id");
    max.unwrap_or(0) + 1_000_000
}

/// Router over a fresh in-memory store, with the request context layer
pub fn memory_app() -> (Router, InMemoryLedgerStore) {
    let store = InMemoryLedgerStore::new();
    (app_with_store(store.clone()), store)
}

pub fn app_with_store<S: LedgerStore + 'static>(store: S) -> Router {
    api::create_router::<S>()
        .layer(middleware::from_fn(context_middleware))
        .with_state(AppState::new(store))
}
