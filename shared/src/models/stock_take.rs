//! Stock-take reconciliation computation
//!
//! The pure half of the reconciliation engine: given the full set of stock
//! lines owned by one account, compute the per-line reckonings and the
//! account-wide grand totals, then roll every line over into the next
//! reporting period. The backend applies the result inside a single database
//! transaction; nothing here touches I/O.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stock_line::StockLine;
use crate::types::{line_value, round_money};

/// Per-line figures computed at reconciliation time. These are persisted as
/// the line's historical snapshot and feed the per-line detail report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineReckoning {
    pub sku: String,
    pub description: String,
    pub xfer_price: Decimal,
    pub retail_price: Decimal,
    pub opening_stock: i64,
    /// `units_total` at the moment of reckoning.
    pub closing_stock: i64,
    /// Signed change over the period; reporting-only.
    pub units_diff: i64,
    pub units_xferred: i64,
    pub units_sold: i64,
    pub units_shrunk: i64,
    /// Units unaccounted for by any recorded movement. Negative for a
    /// shortage, positive for a surplus.
    pub unrecorded_history: i64,
    pub sold_value: Decimal,
    pub shrinkage_value: Decimal,
    pub xferred_value: Decimal,
    pub unrecorded_value_at_xfer_price: Decimal,
    pub unrecorded_value_at_retail_price: Decimal,
    pub held_value_at_xfer_price: Decimal,
    pub held_value_at_retail_price: Decimal,
}

/// Compute one line's reckoning. All monetary results are rounded to the
/// cent before they leave this function.
pub fn reckon_line(line: &StockLine) -> LineReckoning {
    let units_diff = line.units_total - line.opening_stock;
    let unrecorded_history = line.units_total
        - (line.opening_stock + line.xferred_units - line.sold_units - line.shrinkage);

    LineReckoning {
        sku: line.sku.clone(),
        description: line.description.clone(),
        xfer_price: line.xfer_price,
        retail_price: line.selling_price,
        opening_stock: line.opening_stock,
        closing_stock: line.units_total,
        units_diff,
        units_xferred: line.xferred_units,
        units_sold: line.sold_units,
        units_shrunk: line.shrinkage,
        unrecorded_history,
        sold_value: round_money(line.running_total_sold_value),
        shrinkage_value: round_money(line.running_total_shrinkage_value),
        xferred_value: round_money(line.running_total_xfer_value),
        // The discrepancy is priced on its magnitude; the sign survives only
        // in the unit aggregate.
        unrecorded_value_at_xfer_price: line_value(unrecorded_history.abs(), line.xfer_price),
        unrecorded_value_at_retail_price: line_value(unrecorded_history.abs(), line.selling_price),
        held_value_at_xfer_price: line_value(line.units_total, line.xfer_price),
        held_value_at_retail_price: line_value(line.units_total, line.selling_price),
    }
}

/// Account-wide sums across all stock lines for one stock take.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrandTotals {
    pub held_opening_stock: i64,
    pub held_closing_stock: i64,
    pub units_transferred: i64,
    pub units_recorded_sold: i64,
    pub units_recorded_shrunk: i64,
    /// Signed: shortages and surpluses offset one another here.
    pub units_unrecorded_history: i64,
    pub value_recorded_sold: Decimal,
    pub value_recorded_shrunk: Decimal,
    pub value_unrecorded_at_xfer_price: Decimal,
    pub value_unrecorded_at_retail_price: Decimal,
    pub value_transferred: Decimal,
    pub held_value_at_xfer_price: Decimal,
    pub held_value_at_retail_price: Decimal,
    /// The account's new all-time transfer value; filled by
    /// [`GrandTotals::roll_into_all_time`] once the aggregate is known.
    pub all_time_xfer_value: Decimal,
}

impl GrandTotals {
    /// Fold one line's reckoning into the account totals. Monetary inputs
    /// are already rounded, so summation cannot drift.
    pub fn accumulate(&mut self, r: &LineReckoning) {
        self.held_opening_stock += r.opening_stock;
        self.held_closing_stock += r.closing_stock;
        self.units_transferred += r.units_xferred;
        self.units_recorded_sold += r.units_sold;
        self.units_recorded_shrunk += r.units_shrunk;
        self.units_unrecorded_history += r.unrecorded_history;
        self.value_recorded_sold += r.sold_value;
        self.value_recorded_shrunk += r.shrinkage_value;
        self.value_unrecorded_at_xfer_price += r.unrecorded_value_at_xfer_price;
        self.value_unrecorded_at_retail_price += r.unrecorded_value_at_retail_price;
        self.value_transferred += r.xferred_value;
        self.held_value_at_xfer_price += r.held_value_at_xfer_price;
        self.held_value_at_retail_price += r.held_value_at_retail_price;
    }

    /// Compute and record the account's new all-time transfer value:
    /// `round(previous) + transfers this period`.
    pub fn roll_into_all_time(&mut self, previous: Decimal) -> Decimal {
        self.all_time_xfer_value = round_money(previous) + self.value_transferred;
        self.all_time_xfer_value
    }
}

/// One line after reconciliation: its post-rollover state, its reckoning,
/// and whether it closed the period with zero stock and should be pruned.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledLine {
    pub line: StockLine,
    pub reckoning: LineReckoning,
    pub prune: bool,
}

/// The complete result of reconciling one account's stock lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub lines: Vec<ReconciledLine>,
    pub grand: GrandTotals,
}

/// Reckon and roll over every line of one account. Lines are processed in
/// the order given — arbitrary but complete; none may be skipped.
pub fn reconcile(lines: Vec<StockLine>) -> Reconciliation {
    let mut grand = GrandTotals::default();
    let mut reconciled = Vec::with_capacity(lines.len());

    for mut line in lines {
        let reckoning = reckon_line(&line);
        grand.accumulate(&reckoning);
        line.close_period();
        let prune = line.is_spent();
        reconciled.push(ReconciledLine {
            line,
            reckoning,
            prune,
        });
    }

    Reconciliation {
        lines: reconciled,
        grand,
    }
}

/// A completed stock take: the grand totals frozen at `taken_at`.
/// Append-only history; never updated or deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTakeSnapshot {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub taken_at: DateTime<Utc>,
    pub totals: GrandTotals,
}

/// One stock line's figures within a completed stock take.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTakeLineSnapshot {
    pub id: Uuid,
    pub stock_take_id: Uuid,
    pub reckoning: LineReckoning,
}
