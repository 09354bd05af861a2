//! Stock-take service — transactional application of the reconciliation
//!
//! The computation itself is pure and lives in `shared::models::stock_take`;
//! this service wraps it in a single all-or-nothing database transaction
//! spanning every line of the account, the history snapshot and the account
//! aggregate. If anything fails mid-way nothing is applied: the grand totals
//! reported to the user always agree with the per-line figures underneath.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::stock_take::{
    reconcile, GrandTotals, LineReckoning, StockTakeLineSnapshot, StockTakeSnapshot,
};
use shared::models::StockLine;

use super::stock_line::StockLineRow;

/// Stock take service for reconciliation and history reads
#[derive(Clone)]
pub struct StockTakeService {
    db: PgPool,
}

/// The result of one committed stock take, handed onward to the reporting
/// and notification step.
#[derive(Debug, Clone)]
pub struct StockTakeOutcome {
    pub owner_id: Uuid,
    pub stock_take_id: Uuid,
    pub taken_at: DateTime<Utc>,
    pub reckonings: Vec<LineReckoning>,
    pub grand: GrandTotals,
    pub lines_pruned: usize,
}

#[derive(Debug, FromRow)]
struct StockTakeRow {
    id: Uuid,
    owner_id: Uuid,
    taken_at: DateTime<Utc>,
    held_opening_stock: i64,
    held_closing_stock: i64,
    units_transferred: i64,
    units_recorded_sold: i64,
    units_recorded_shrunk: i64,
    units_unrecorded_history: i64,
    value_recorded_sold: Decimal,
    value_recorded_shrunk: Decimal,
    value_unrecorded_at_xfer_price: Decimal,
    value_unrecorded_at_retail_price: Decimal,
    value_transferred: Decimal,
    held_value_at_xfer_price: Decimal,
    held_value_at_retail_price: Decimal,
    all_time_xfer_value: Decimal,
}

impl From<StockTakeRow> for StockTakeSnapshot {
    fn from(row: StockTakeRow) -> Self {
        StockTakeSnapshot {
            id: row.id,
            owner_id: row.owner_id,
            taken_at: row.taken_at,
            totals: GrandTotals {
                held_opening_stock: row.held_opening_stock,
                held_closing_stock: row.held_closing_stock,
                units_transferred: row.units_transferred,
                units_recorded_sold: row.units_recorded_sold,
                units_recorded_shrunk: row.units_recorded_shrunk,
                units_unrecorded_history: row.units_unrecorded_history,
                value_recorded_sold: row.value_recorded_sold,
                value_recorded_shrunk: row.value_recorded_shrunk,
                value_unrecorded_at_xfer_price: row.value_unrecorded_at_xfer_price,
                value_unrecorded_at_retail_price: row.value_unrecorded_at_retail_price,
                value_transferred: row.value_transferred,
                held_value_at_xfer_price: row.held_value_at_xfer_price,
                held_value_at_retail_price: row.held_value_at_retail_price,
                all_time_xfer_value: row.all_time_xfer_value,
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct StockTakeLineRow {
    id: Uuid,
    stock_take_id: Uuid,
    sku: String,
    description: String,
    xfer_price: Decimal,
    retail_price: Decimal,
    opening_stock: i64,
    closing_stock: i64,
    units_diff: i64,
    units_xferred: i64,
    units_sold: i64,
    units_shrunk: i64,
    unrecorded_history: i64,
    sold_value: Decimal,
    shrinkage_value: Decimal,
    xferred_value: Decimal,
    unrecorded_value_at_xfer_price: Decimal,
    unrecorded_value_at_retail_price: Decimal,
    held_value_at_xfer_price: Decimal,
    held_value_at_retail_price: Decimal,
}

impl From<StockTakeLineRow> for StockTakeLineSnapshot {
    fn from(row: StockTakeLineRow) -> Self {
        StockTakeLineSnapshot {
            id: row.id,
            stock_take_id: row.stock_take_id,
            reckoning: LineReckoning {
                sku: row.sku,
                description: row.description,
                xfer_price: row.xfer_price,
                retail_price: row.retail_price,
                opening_stock: row.opening_stock,
                closing_stock: row.closing_stock,
                units_diff: row.units_diff,
                units_xferred: row.units_xferred,
                units_sold: row.units_sold,
                units_shrunk: row.units_shrunk,
                unrecorded_history: row.unrecorded_history,
                sold_value: row.sold_value,
                shrinkage_value: row.shrinkage_value,
                xferred_value: row.xferred_value,
                unrecorded_value_at_xfer_price: row.unrecorded_value_at_xfer_price,
                unrecorded_value_at_retail_price: row.unrecorded_value_at_retail_price,
                held_value_at_xfer_price: row.held_value_at_xfer_price,
                held_value_at_retail_price: row.held_value_at_retail_price,
            },
        }
    }
}

impl StockTakeService {
    /// Create a new StockTakeService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Run one stock take for one account.
    ///
    /// Every line is read under a row lock, reckoned and rolled over; the
    /// snapshot, the per-line history rows, the account aggregate update and
    /// the zero-stock pruning all commit together or not at all. Reporting
    /// and notification happen after commit, in the job wrapper.
    pub async fn reconcile(&self, owner_id: Uuid) -> AppResult<StockTakeOutcome> {
        let mut tx = self.db.begin().await?;

        // Consistent reads for the whole reconciliation: no other writer may
        // touch a line the engine is mid-computation on.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query_as::<_, StockLineRow>(
            r#"
            SELECT id, owner_id, sku, description, units_total, opening_stock,
                   xferred_units, sold_units, shrinkage, xfer_price, selling_price,
                   running_total_xfer_value, running_total_sold_value,
                   running_total_shrinkage_value, all_time_total_xfer_value,
                   created_at, updated_at
            FROM stock_lines
            WHERE owner_id = $1
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(owner_id)
        .fetch_all(&mut *tx)
        .await?;

        if rows.is_empty() {
            return Err(AppError::NotFound("Stock lines for account".to_string()));
        }

        let lines: Vec<StockLine> = rows.into_iter().map(Into::into).collect();
        let mut reconciliation = reconcile(lines);

        // The account aggregate must exist (and be locked) before the
        // all-time roll-up.
        sqlx::query("INSERT INTO accounts (owner_id) VALUES ($1) ON CONFLICT (owner_id) DO NOTHING")
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        let previous: Decimal = sqlx::query_scalar(
            "SELECT all_time_total_xfer_value FROM accounts WHERE owner_id = $1 FOR UPDATE",
        )
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        reconciliation.grand.roll_into_all_time(previous);

        let taken_at = Utc::now();
        let stock_take_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO stock_takes (owner_id, taken_at, held_opening_stock, held_closing_stock,
                                     units_transferred, units_recorded_sold, units_recorded_shrunk,
                                     units_unrecorded_history, value_recorded_sold,
                                     value_recorded_shrunk, value_unrecorded_at_xfer_price,
                                     value_unrecorded_at_retail_price, value_transferred,
                                     held_value_at_xfer_price, held_value_at_retail_price,
                                     all_time_xfer_value)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(taken_at)
        .bind(reconciliation.grand.held_opening_stock)
        .bind(reconciliation.grand.held_closing_stock)
        .bind(reconciliation.grand.units_transferred)
        .bind(reconciliation.grand.units_recorded_sold)
        .bind(reconciliation.grand.units_recorded_shrunk)
        .bind(reconciliation.grand.units_unrecorded_history)
        .bind(reconciliation.grand.value_recorded_sold)
        .bind(reconciliation.grand.value_recorded_shrunk)
        .bind(reconciliation.grand.value_unrecorded_at_xfer_price)
        .bind(reconciliation.grand.value_unrecorded_at_retail_price)
        .bind(reconciliation.grand.value_transferred)
        .bind(reconciliation.grand.held_value_at_xfer_price)
        .bind(reconciliation.grand.held_value_at_retail_price)
        .bind(reconciliation.grand.all_time_xfer_value)
        .fetch_one(&mut *tx)
        .await?;

        let mut lines_pruned = 0;
        for reconciled in &reconciliation.lines {
            let r = &reconciled.reckoning;
            sqlx::query(
                r#"
                INSERT INTO stock_take_lines (stock_take_id, sku, description, xfer_price,
                                              retail_price, opening_stock, closing_stock,
                                              units_diff, units_xferred, units_sold, units_shrunk,
                                              unrecorded_history, sold_value, shrinkage_value,
                                              xferred_value, unrecorded_value_at_xfer_price,
                                              unrecorded_value_at_retail_price,
                                              held_value_at_xfer_price, held_value_at_retail_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                        $17, $18, $19)
                "#,
            )
            .bind(stock_take_id)
            .bind(&r.sku)
            .bind(&r.description)
            .bind(r.xfer_price)
            .bind(r.retail_price)
            .bind(r.opening_stock)
            .bind(r.closing_stock)
            .bind(r.units_diff)
            .bind(r.units_xferred)
            .bind(r.units_sold)
            .bind(r.units_shrunk)
            .bind(r.unrecorded_history)
            .bind(r.sold_value)
            .bind(r.shrinkage_value)
            .bind(r.xferred_value)
            .bind(r.unrecorded_value_at_xfer_price)
            .bind(r.unrecorded_value_at_retail_price)
            .bind(r.held_value_at_xfer_price)
            .bind(r.held_value_at_retail_price)
            .execute(&mut *tx)
            .await?;

            if reconciled.prune {
                // Period closed with zero stock: the line is stale and goes.
                sqlx::query("DELETE FROM stock_lines WHERE id = $1")
                    .bind(reconciled.line.id)
                    .execute(&mut *tx)
                    .await?;
                lines_pruned += 1;
            } else {
                sqlx::query(
                    r#"
                    UPDATE stock_lines
                    SET opening_stock = $1, xferred_units = 0, sold_units = 0, shrinkage = 0,
                        running_total_xfer_value = 0, running_total_sold_value = 0,
                        running_total_shrinkage_value = 0, updated_at = NOW()
                    WHERE id = $2
                    "#,
                )
                .bind(reconciled.line.opening_stock)
                .bind(reconciled.line.id)
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query(
            "UPDATE accounts SET all_time_total_xfer_value = $1, updated_at = NOW() WHERE owner_id = $2",
        )
        .bind(reconciliation.grand.all_time_xfer_value)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            %owner_id,
            %stock_take_id,
            lines = reconciliation.lines.len(),
            lines_pruned,
            "stock take committed"
        );

        Ok(StockTakeOutcome {
            owner_id,
            stock_take_id,
            taken_at,
            reckonings: reconciliation
                .lines
                .into_iter()
                .map(|reconciled| reconciled.reckoning)
                .collect(),
            grand: reconciliation.grand,
            lines_pruned,
        })
    }

    /// Stock-take history for one account, newest first.
    pub async fn list_for_owner(&self, owner_id: Uuid) -> AppResult<Vec<StockTakeSnapshot>> {
        let rows = sqlx::query_as::<_, StockTakeRow>(
            r#"
            SELECT id, owner_id, taken_at, held_opening_stock, held_closing_stock,
                   units_transferred, units_recorded_sold, units_recorded_shrunk,
                   units_unrecorded_history, value_recorded_sold, value_recorded_shrunk,
                   value_unrecorded_at_xfer_price, value_unrecorded_at_retail_price,
                   value_transferred, held_value_at_xfer_price, held_value_at_retail_price,
                   all_time_xfer_value
            FROM stock_takes
            WHERE owner_id = $1
            ORDER BY taken_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The per-line snapshots of one completed stock take.
    pub async fn lines_for(&self, stock_take_id: Uuid) -> AppResult<Vec<StockTakeLineSnapshot>> {
        let rows = sqlx::query_as::<_, StockTakeLineRow>(
            r#"
            SELECT id, stock_take_id, sku, description, xfer_price, retail_price,
                   opening_stock, closing_stock, units_diff, units_xferred, units_sold,
                   units_shrunk, unrecorded_history, sold_value, shrinkage_value,
                   xferred_value, unrecorded_value_at_xfer_price,
                   unrecorded_value_at_retail_price, held_value_at_xfer_price,
                   held_value_at_retail_price
            FROM stock_take_lines
            WHERE stock_take_id = $1
            ORDER BY sku
            "#,
        )
        .bind(stock_take_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
