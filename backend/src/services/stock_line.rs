//! Stock line ledger service
//!
//! Persistence for per-account stock lines and the role-gated edit paths.
//! Which update type a caller may use is decided at the API boundary; the
//! arithmetic itself lives on the domain model in the shared crate and is
//! applied here inside a row-locking transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::models::{AdminStockLineUpdate, StaffStockLineUpdate, StockLine, User};
use shared::validation::{validate_alphanumplus, validate_price, validate_units};

/// Stock line service for ledger reads and ordinary edits
#[derive(Clone)]
pub struct StockLineService {
    db: PgPool,
}

/// Database row for a stock line
#[derive(Debug, FromRow)]
pub(crate) struct StockLineRow {
    id: Uuid,
    owner_id: Uuid,
    sku: String,
    description: String,
    units_total: i64,
    opening_stock: i64,
    xferred_units: i64,
    sold_units: i64,
    shrinkage: i64,
    xfer_price: Decimal,
    selling_price: Decimal,
    running_total_xfer_value: Decimal,
    running_total_sold_value: Decimal,
    running_total_shrinkage_value: Decimal,
    all_time_total_xfer_value: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StockLineRow> for StockLine {
    fn from(row: StockLineRow) -> Self {
        StockLine {
            id: row.id,
            owner_id: row.owner_id,
            sku: row.sku,
            description: row.description,
            units_total: row.units_total,
            opening_stock: row.opening_stock,
            xferred_units: row.xferred_units,
            sold_units: row.sold_units,
            shrinkage: row.shrinkage,
            xfer_price: row.xfer_price,
            selling_price: row.selling_price,
            running_total_xfer_value: row.running_total_xfer_value,
            running_total_sold_value: row.running_total_sold_value,
            running_total_shrinkage_value: row.running_total_shrinkage_value,
            all_time_total_xfer_value: row.all_time_total_xfer_value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a stock line manually (administrator path; ordinary
/// creation happens through a warehouse transfer).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStockLineInput {
    #[validate(length(min = 1, max = 100), custom = "validate_alphanumplus")]
    pub sku: String,
    #[validate(length(max = 100), custom = "validate_alphanumplus")]
    pub description: String,
    pub units_total: Option<i64>,
    pub xfer_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
}

impl StockLineService {
    /// Create a new StockLineService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All stock lines for one account, oldest first.
    pub async fn list_for_owner(&self, owner_id: Uuid) -> AppResult<Vec<StockLine>> {
        let rows = sqlx::query_as::<_, StockLineRow>(
            r#"
            SELECT id, owner_id, sku, description, units_total, opening_stock,
                   xferred_units, sold_units, shrinkage, xfer_price, selling_price,
                   running_total_xfer_value, running_total_sold_value,
                   running_total_shrinkage_value, all_time_total_xfer_value,
                   created_at, updated_at
            FROM stock_lines
            WHERE owner_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Search one account's lines by SKU or description substring.
    pub async fn search(&self, owner_id: Uuid, term: &str) -> AppResult<Vec<StockLine>> {
        shared::validation::validate_search(term).map_err(|_| AppError::Validation {
            field: "search".to_string(),
            message: format!("{} contains invalid characters", term),
        })?;

        let rows = sqlx::query_as::<_, StockLineRow>(
            r#"
            SELECT id, owner_id, sku, description, units_total, opening_stock,
                   xferred_units, sold_units, shrinkage, xfer_price, selling_price,
                   running_total_xfer_value, running_total_sold_value,
                   running_total_shrinkage_value, all_time_total_xfer_value,
                   created_at, updated_at
            FROM stock_lines
            WHERE owner_id = $1 AND (sku ILIKE $2 OR description ILIKE $2)
            ORDER BY created_at, id
            "#,
        )
        .bind(owner_id)
        .bind(format!("%{}%", term))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get one stock line of one account.
    pub async fn get(&self, owner_id: Uuid, line_id: Uuid) -> AppResult<StockLine> {
        let row = sqlx::query_as::<_, StockLineRow>(
            r#"
            SELECT id, owner_id, sku, description, units_total, opening_stock,
                   xferred_units, sold_units, shrinkage, xfer_price, selling_price,
                   running_total_xfer_value, running_total_sold_value,
                   running_total_shrinkage_value, all_time_total_xfer_value,
                   created_at, updated_at
            FROM stock_lines
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(line_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock line".to_string()))?;

        Ok(row.into())
    }

    /// Create a stock line by hand. Uniqueness of `(owner_id, sku)` is
    /// checked before insert; the database constraint backs it up.
    pub async fn create(&self, owner_id: Uuid, input: CreateStockLineInput) -> AppResult<StockLine> {
        input.validate()?;

        let units_total = input.units_total.unwrap_or(0);
        let xfer_price = input.xfer_price.unwrap_or(Decimal::ZERO);
        let selling_price = input.selling_price.unwrap_or(Decimal::ZERO);

        validate_units(units_total).map_err(|message| AppError::Validation {
            field: "units_total".to_string(),
            message: message.to_string(),
        })?;
        for (field, price) in [("xfer_price", xfer_price), ("selling_price", selling_price)] {
            validate_price(price).map_err(|message| AppError::Validation {
                field: field.to_string(),
                message: message.to_string(),
            })?;
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stock_lines WHERE owner_id = $1 AND sku = $2)",
        )
        .bind(owner_id)
        .bind(&input.sku)
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::DuplicateEntry(input.sku));
        }

        let row = sqlx::query_as::<_, StockLineRow>(
            r#"
            INSERT INTO stock_lines (owner_id, sku, description, units_total, opening_stock,
                                     xfer_price, selling_price)
            VALUES ($1, $2, $3, $4, $4, $5, $6)
            RETURNING id, owner_id, sku, description, units_total, opening_stock,
                      xferred_units, sold_units, shrinkage, xfer_price, selling_price,
                      running_total_xfer_value, running_total_sold_value,
                      running_total_shrinkage_value, all_time_total_xfer_value,
                      created_at, updated_at
            "#,
        )
        .bind(owner_id)
        .bind(&input.sku)
        .bind(&input.description)
        .bind(units_total)
        .bind(xfer_price)
        .bind(selling_price)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Full-field edit by an administrator.
    pub async fn update_as_admin(
        &self,
        owner_id: Uuid,
        line_id: Uuid,
        update: AdminStockLineUpdate,
    ) -> AppResult<StockLine> {
        let mut tx = self.db.begin().await?;
        let mut line = fetch_line_for_update(&mut tx, owner_id, line_id).await?;
        update.apply(&mut line)?;
        let line = persist_line(&mut tx, &line).await?;
        tx.commit().await?;
        Ok(line)
    }

    /// Restricted edit by store staff: sales, shrinkage, selling price and
    /// downward stock corrections only.
    pub async fn update_as_staff(
        &self,
        owner_id: Uuid,
        line_id: Uuid,
        update: StaffStockLineUpdate,
    ) -> AppResult<StockLine> {
        let mut tx = self.db.begin().await?;
        let mut line = fetch_line_for_update(&mut tx, owner_id, line_id).await?;
        update.apply(&mut line)?;
        let line = persist_line(&mut tx, &line).await?;
        tx.commit().await?;
        Ok(line)
    }

    /// Delete a stock line. Administrators only.
    pub async fn delete(&self, requester: &User, owner_id: Uuid, line_id: Uuid) -> AppResult<()> {
        if !requester.is_administrator() {
            return Err(AppError::Unauthorized(
                "you are not authorized to delete account stock lines".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM stock_lines WHERE id = $1 AND owner_id = $2")
            .bind(line_id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Stock line".to_string()));
        }

        Ok(())
    }

    /// Whether an account currently holds any stock lines.
    pub async fn has_stock(&self, owner_id: Uuid) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stock_lines WHERE owner_id = $1)",
        )
        .bind(owner_id)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    /// Every owner currently holding stock, for the scheduler sweep.
    pub async fn owners_with_stock(&self) -> AppResult<Vec<Uuid>> {
        let owners =
            sqlx::query_scalar::<_, Uuid>("SELECT DISTINCT owner_id FROM stock_lines ORDER BY owner_id")
                .fetch_all(&self.db)
                .await?;

        Ok(owners)
    }
}

/// Fetch one line under a row lock for read-modify-write.
pub(crate) async fn fetch_line_for_update(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
    line_id: Uuid,
) -> AppResult<StockLine> {
    let row = sqlx::query_as::<_, StockLineRow>(
        r#"
        SELECT id, owner_id, sku, description, units_total, opening_stock,
               xferred_units, sold_units, shrinkage, xfer_price, selling_price,
               running_total_xfer_value, running_total_sold_value,
               running_total_shrinkage_value, all_time_total_xfer_value,
               created_at, updated_at
        FROM stock_lines
        WHERE id = $1 AND owner_id = $2
        FOR UPDATE
        "#,
    )
    .bind(line_id)
    .bind(owner_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Stock line".to_string()))?;

    Ok(row.into())
}

/// Write an edited line back, returning the stored state.
pub(crate) async fn persist_line(
    tx: &mut Transaction<'_, Postgres>,
    line: &StockLine,
) -> AppResult<StockLine> {
    let row = sqlx::query_as::<_, StockLineRow>(
        r#"
        UPDATE stock_lines
        SET description = $1, units_total = $2, opening_stock = $3, xferred_units = $4,
            sold_units = $5, shrinkage = $6, xfer_price = $7, selling_price = $8,
            running_total_xfer_value = $9, running_total_sold_value = $10,
            running_total_shrinkage_value = $11, all_time_total_xfer_value = $12,
            updated_at = NOW()
        WHERE id = $13
        RETURNING id, owner_id, sku, description, units_total, opening_stock,
                  xferred_units, sold_units, shrinkage, xfer_price, selling_price,
                  running_total_xfer_value, running_total_sold_value,
                  running_total_shrinkage_value, all_time_total_xfer_value,
                  created_at, updated_at
        "#,
    )
    .bind(&line.description)
    .bind(line.units_total)
    .bind(line.opening_stock)
    .bind(line.xferred_units)
    .bind(line.sold_units)
    .bind(line.shrinkage)
    .bind(line.xfer_price)
    .bind(line.selling_price)
    .bind(line.running_total_xfer_value)
    .bind(line.running_total_sold_value)
    .bind(line.running_total_shrinkage_value)
    .bind(line.all_time_total_xfer_value)
    .bind(line.id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row.into())
}
