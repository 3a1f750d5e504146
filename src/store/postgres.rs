//! PostgreSQL ledger store
//!
//! Row locks are taken with `SELECT ... FOR NO KEY UPDATE` and released when
//! the surrounding `sqlx::Transaction` commits or rolls back. An uncommitted
//! transaction is rolled back when dropped.
//!
//! `FOR UPDATE` would conflict with the `FOR KEY SHARE` locks the foreign key
//! checks on `transactions` already hold on both accounts.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::{Account, Transfer};

use super::{LedgerStore, LedgerTransaction, StoreError, TransferFilter, MAX_PAGE_SIZE};

/// Foreign key names from `migrations/0001_create_ledger.sql`
const FROM_ACCOUNT_FK: &str = "transactions_from_account_fk";
const TO_ACCOUNT_FK: &str = "transactions_to_account_fk";

/// Ledger store backed by a Postgres pool
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = PgLedgerTransaction;

    async fn create_account(&self, balance: i64, currency: &str) -> Result<Account, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (balance, currency)
            VALUES ($1, $2)
            RETURNING id, balance, currency, created_at
            "#,
        )
        .bind(balance)
        .bind(currency)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    async fn get_account(&self, id: i64) -> Result<Account, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, balance, currency, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::AccountNotFound(id))
    }

    async fn list_transfers(&self, filter: &TransferFilter) -> Result<Vec<Transfer>, StoreError> {
        let limit = filter.limit.clamp(0, MAX_PAGE_SIZE);
        let offset = filter.offset.max(0);

        let transfers = match filter.account_id {
            Some(account_id) => {
                sqlx::query_as::<_, Transfer>(
                    r#"
                    SELECT id, from_account_id, to_account_id, amount, created_at
                    FROM transactions
                    WHERE from_account_id = $1 OR to_account_id = $1
                    ORDER BY id ASC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(account_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Transfer>(
                    r#"
                    SELECT id, from_account_id, to_account_id, amount, created_at
                    FROM transactions
                    ORDER BY id ASC
                    LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(transfers)
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgLedgerTransaction { tx })
    }
}

/// Open Postgres transaction
pub struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    async fn lock_account_for_update(&mut self, id: i64) -> Result<Account, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, balance, currency, created_at
            FROM accounts
            WHERE id = $1
            FOR NO KEY UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(StoreError::AccountNotFound(id))
    }

    async fn set_account_balance(&mut self, id: i64, balance: i64) -> Result<(), StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(balance)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::AccountNotFound(id));
        }

        Ok(())
    }

    async fn insert_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        sqlx::query_as::<_, Transfer>(
            r#"
            INSERT INTO transactions (from_account_id, to_account_id, amount)
            VALUES ($1, $2, $3)
            RETURNING id, from_account_id, to_account_id, amount, created_at
            "#,
        )
        .bind(from_account_id)
        .bind(to_account_id)
        .bind(amount)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_missing_account(e, from_account_id, to_account_id))
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Turn a foreign key violation on the transfer row into the missing account id
fn map_missing_account(err: sqlx::Error, from_account_id: i64, to_account_id: i64) -> StoreError {
    let constraint = err
        .as_database_error()
        .filter(|db| db.is_foreign_key_violation())
        .and_then(|db| db.constraint().map(str::to_owned));

    match constraint.as_deref() {
        Some(FROM_ACCOUNT_FK) => StoreError::AccountNotFound(from_account_id),
        Some(TO_ACCOUNT_FK) => StoreError::AccountNotFound(to_account_id),
        _ => StoreError::Database(err),
    }
}
