//! Warehouse stock service
//!
//! The warehouse side of the ledger: SKUs held centrally before transfer to
//! an account. A transfer decrements the warehouse item and credits the
//! requester's stock line in the same transaction, so the two sides can
//! never disagree.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::models::{StockLine, User, WarehouseItem};
use shared::types::line_value;
use shared::validation::{validate_alphanumplus, validate_price, validate_units};

use super::stock_line::{persist_line, StockLineRow};

/// Warehouse service for central stock and transfers
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct WarehouseItemRow {
    id: Uuid,
    sku: String,
    description: String,
    units_total: i64,
    unit_price: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WarehouseItemRow> for WarehouseItem {
    fn from(row: WarehouseItemRow) -> Self {
        WarehouseItem {
            id: row.id,
            sku: row.sku,
            description: row.description,
            units_total: row.units_total,
            unit_price: row.unit_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for stocking a new warehouse SKU
#[derive(Debug, Deserialize, Validate)]
pub struct CreateWarehouseItemInput {
    #[validate(length(min = 1, max = 100), custom = "validate_alphanumplus")]
    pub sku: String,
    #[validate(length(max = 100), custom = "validate_alphanumplus")]
    pub description: String,
    pub units_total: i64,
    pub unit_price: Decimal,
}

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All warehouse SKUs, oldest first.
    pub async fn list(&self) -> AppResult<Vec<WarehouseItem>> {
        let rows = sqlx::query_as::<_, WarehouseItemRow>(
            r#"
            SELECT id, sku, description, units_total, unit_price, created_at, updated_at
            FROM warehouse_items
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get one warehouse item.
    pub async fn get(&self, item_id: Uuid) -> AppResult<WarehouseItem> {
        let row = sqlx::query_as::<_, WarehouseItemRow>(
            r#"
            SELECT id, sku, description, units_total, unit_price, created_at, updated_at
            FROM warehouse_items
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse item".to_string()))?;

        Ok(row.into())
    }

    /// Stock a new SKU in the warehouse. Administrators only.
    pub async fn create(
        &self,
        requester: &User,
        input: CreateWarehouseItemInput,
    ) -> AppResult<WarehouseItem> {
        if !requester.is_administrator() {
            return Err(AppError::Unauthorized(
                "you are not authorized to create warehouse stock".to_string(),
            ));
        }
        input.validate()?;
        validate_units(input.units_total).map_err(|message| AppError::Validation {
            field: "units_total".to_string(),
            message: message.to_string(),
        })?;
        validate_price(input.unit_price).map_err(|message| AppError::Validation {
            field: "unit_price".to_string(),
            message: message.to_string(),
        })?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouse_items WHERE sku = $1)",
        )
        .bind(&input.sku)
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::DuplicateEntry(input.sku));
        }

        let row = sqlx::query_as::<_, WarehouseItemRow>(
            r#"
            INSERT INTO warehouse_items (sku, description, units_total, unit_price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, sku, description, units_total, unit_price, created_at, updated_at
            "#,
        )
        .bind(&input.sku)
        .bind(&input.description)
        .bind(input.units_total)
        .bind(input.unit_price)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Transfer `units` of a warehouse item to the requester's account.
    ///
    /// One transaction: the warehouse count comes down, the requester's
    /// stock line (created on first transfer) takes the units plus the
    /// rounded transfer value into its period and all-time totals.
    pub async fn transfer(
        &self,
        requester: &User,
        item_id: Uuid,
        units: i64,
    ) -> AppResult<StockLine> {
        let mut tx = self.db.begin().await?;

        let item_row = sqlx::query_as::<_, WarehouseItemRow>(
            r#"
            SELECT id, sku, description, units_total, unit_price, created_at, updated_at
            FROM warehouse_items
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse item".to_string()))?;

        let mut item: WarehouseItem = item_row.into();
        item.withdraw(units)?;

        sqlx::query("UPDATE warehouse_items SET units_total = $1, updated_at = NOW() WHERE id = $2")
            .bind(item.units_total)
            .bind(item.id)
            .execute(&mut *tx)
            .await?;

        let existing = sqlx::query_as::<_, StockLineRow>(
            r#"
            SELECT id, owner_id, sku, description, units_total, opening_stock,
                   xferred_units, sold_units, shrinkage, xfer_price, selling_price,
                   running_total_xfer_value, running_total_sold_value,
                   running_total_shrinkage_value, all_time_total_xfer_value,
                   created_at, updated_at
            FROM stock_lines
            WHERE owner_id = $1 AND sku = $2
            FOR UPDATE
            "#,
        )
        .bind(requester.id)
        .bind(&item.sku)
        .fetch_optional(&mut *tx)
        .await?;

        let line = match existing {
            Some(row) => {
                let mut line: StockLine = row.into();
                line.receive_transfer(units, item.unit_price)?;
                line.description = item.description.clone();
                persist_line(&mut tx, &line).await?
            }
            None => {
                let value = line_value(units, item.unit_price);
                let row = sqlx::query_as::<_, StockLineRow>(
                    r#"
                    INSERT INTO stock_lines (owner_id, sku, description, units_total,
                                             xferred_units, xfer_price,
                                             running_total_xfer_value, all_time_total_xfer_value)
                    VALUES ($1, $2, $3, $4, $4, $5, $6, $6)
                    RETURNING id, owner_id, sku, description, units_total, opening_stock,
                              xferred_units, sold_units, shrinkage, xfer_price, selling_price,
                              running_total_xfer_value, running_total_sold_value,
                              running_total_shrinkage_value, all_time_total_xfer_value,
                              created_at, updated_at
                    "#,
                )
                .bind(requester.id)
                .bind(&item.sku)
                .bind(&item.description)
                .bind(units)
                .bind(item.unit_price)
                .bind(value)
                .fetch_one(&mut *tx)
                .await?;
                row.into()
            }
        };

        tx.commit().await?;

        tracing::info!(
            requester = %requester.username,
            sku = %line.sku,
            units,
            "warehouse transfer committed"
        );

        Ok(line)
    }
}
