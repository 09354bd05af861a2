//! Account aggregate service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::Account;

/// Account service for the per-owner all-time aggregate
#[derive(Clone)]
pub struct AccountService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    owner_id: Uuid,
    all_time_total_xfer_value: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            owner_id: row.owner_id,
            all_time_total_xfer_value: row.all_time_total_xfer_value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl AccountService {
    /// Create a new AccountService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Fetch the aggregate for an owner, creating it lazily on first use.
    pub async fn get_or_create(&self, owner_id: Uuid) -> AppResult<Account> {
        sqlx::query("INSERT INTO accounts (owner_id) VALUES ($1) ON CONFLICT (owner_id) DO NOTHING")
            .bind(owner_id)
            .execute(&self.db)
            .await?;

        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, owner_id, all_time_total_xfer_value, created_at, updated_at
            FROM accounts
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Fetch the aggregate for an owner, if it exists yet.
    pub async fn get(&self, owner_id: Uuid) -> AppResult<Account> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, owner_id, all_time_total_xfer_value, created_at, updated_at
            FROM accounts
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Account".to_string()))?;

        Ok(row.into())
    }
}
