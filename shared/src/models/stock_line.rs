//! Stock line ledger model and mutation arithmetic
//!
//! A stock line is one SKU's ledger row for one account: the live on-hand
//! quantity plus the running counters for the current reporting period. All
//! mutation arithmetic lives here so the write paths in the backend only have
//! to persist the result.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::line_value;

/// Errors raised by ledger mutations. These are validation failures surfaced
/// to the caller of the edit path, never panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("stock adjustments must cover a positive number of units")]
    NonPositiveUnits,

    #[error("insufficient stock of {sku}: {available} units held, {requested} requested")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    #[error("units_total cannot be negative")]
    NegativeUnits,

    #[error("prices must be non-negative with at most 2 decimal places")]
    InvalidPrice,

    #[error("staff may not increase units_total")]
    StaffUnitsIncrease,
}

/// One SKU's ledger row for one account.
///
/// `(owner_id, sku)` is unique. Unit counters are period-scoped except
/// `units_total` (live on-hand) and `all_time_total_xfer_value`, which is
/// never reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLine {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub sku: String,
    pub description: String,
    /// Current on-hand units. Never negative.
    pub units_total: i64,
    /// On-hand units at the start of the current reporting period.
    pub opening_stock: i64,
    pub xferred_units: i64,
    pub sold_units: i64,
    pub shrinkage: i64,
    pub xfer_price: Decimal,
    pub selling_price: Decimal,
    pub running_total_xfer_value: Decimal,
    pub running_total_sold_value: Decimal,
    pub running_total_shrinkage_value: Decimal,
    /// Cumulative transfer value across all stock takes. Never reset.
    pub all_time_total_xfer_value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockLine {
    /// Record units sold at the current selling price: increments
    /// `sold_units`, decrements `units_total` and adds the rounded sale value
    /// to the running sold total.
    pub fn record_sale(&mut self, units: i64) -> Result<(), LedgerError> {
        let value = self.withdraw(units)?;
        self.sold_units += units;
        self.running_total_sold_value += value;
        Ok(())
    }

    /// Record shrinkage (unsold loss), valued at the current selling price.
    pub fn record_shrinkage(&mut self, units: i64) -> Result<(), LedgerError> {
        let value = self.withdraw(units)?;
        self.shrinkage += units;
        self.running_total_shrinkage_value += value;
        Ok(())
    }

    /// Receive a transfer of `units` at `unit_price`: bumps the on-hand
    /// count, the period transfer counters and the all-time transfer value,
    /// and refreshes the line's transfer price.
    ///
    /// Returns the rounded value of the transfer.
    pub fn receive_transfer(&mut self, units: i64, unit_price: Decimal) -> Result<Decimal, LedgerError> {
        if units <= 0 {
            return Err(LedgerError::NonPositiveUnits);
        }
        let value = line_value(units, unit_price);
        self.units_total += units;
        self.xferred_units += units;
        self.running_total_xfer_value += value;
        self.all_time_total_xfer_value += value;
        self.xfer_price = unit_price;
        Ok(value)
    }

    /// Period rollover performed by the reconciliation engine: the current
    /// on-hand count becomes next period's opening baseline and every period
    /// counter restarts at zero. `units_total` is left untouched.
    pub fn close_period(&mut self) {
        self.opening_stock = self.units_total;
        self.xferred_units = 0;
        self.sold_units = 0;
        self.shrinkage = 0;
        self.running_total_xfer_value = Decimal::ZERO;
        self.running_total_sold_value = Decimal::ZERO;
        self.running_total_shrinkage_value = Decimal::ZERO;
    }

    /// A line that closed a period with zero stock is pruned from the ledger.
    pub fn is_spent(&self) -> bool {
        self.units_total == 0
    }

    /// Take `units` out of the on-hand count, valued at the selling price.
    fn withdraw(&mut self, units: i64) -> Result<Decimal, LedgerError> {
        if units <= 0 {
            return Err(LedgerError::NonPositiveUnits);
        }
        if units > self.units_total {
            return Err(LedgerError::InsufficientStock {
                sku: self.sku.clone(),
                available: self.units_total,
                requested: units,
            });
        }
        self.units_total -= units;
        Ok(line_value(units, self.selling_price))
    }

    fn set_selling_price(&mut self, price: Decimal) -> Result<(), LedgerError> {
        if price.is_sign_negative() || price.scale() > 2 {
            return Err(LedgerError::InvalidPrice);
        }
        self.selling_price = price;
        Ok(())
    }

    fn set_xfer_price(&mut self, price: Decimal) -> Result<(), LedgerError> {
        if price.is_sign_negative() || price.scale() > 2 {
            return Err(LedgerError::InvalidPrice);
        }
        self.xfer_price = price;
        Ok(())
    }
}

/// Full-field edit, available to administrators only. The role split is
/// decided at the API boundary by choosing the update type, not by filtering
/// submitted keys at runtime.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminStockLineUpdate {
    pub description: Option<String>,
    /// Absolute on-hand count; administrators may increase it.
    pub units_total: Option<i64>,
    pub xfer_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    /// Increment: units sold since the last edit.
    pub sold_units: Option<i64>,
    /// Increment: units lost since the last edit.
    pub shrinkage: Option<i64>,
}

impl AdminStockLineUpdate {
    /// Apply to an owned copy of the line; on error the caller discards the
    /// copy, so a partially-applied update is never persisted.
    pub fn apply(&self, line: &mut StockLine) -> Result<(), LedgerError> {
        if let Some(units) = self.sold_units {
            line.record_sale(units)?;
        }
        if let Some(units) = self.shrinkage {
            line.record_shrinkage(units)?;
        }
        if let Some(ref description) = self.description {
            line.description = description.clone();
        }
        if let Some(price) = self.xfer_price {
            line.set_xfer_price(price)?;
        }
        if let Some(price) = self.selling_price {
            line.set_selling_price(price)?;
        }
        if let Some(units) = self.units_total {
            if units < 0 {
                return Err(LedgerError::NegativeUnits);
            }
            line.units_total = units;
        }
        Ok(())
    }
}

/// Restricted edit for staff: sales, shrinkage, the selling price, and a
/// downward correction of the on-hand count. Staff may never increase
/// `units_total`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffStockLineUpdate {
    pub units_total: Option<i64>,
    pub selling_price: Option<Decimal>,
    pub sold_units: Option<i64>,
    pub shrinkage: Option<i64>,
}

impl StaffStockLineUpdate {
    pub fn apply(&self, line: &mut StockLine) -> Result<(), LedgerError> {
        if let Some(units) = self.sold_units {
            line.record_sale(units)?;
        }
        if let Some(units) = self.shrinkage {
            line.record_shrinkage(units)?;
        }
        if let Some(price) = self.selling_price {
            line.set_selling_price(price)?;
        }
        if let Some(units) = self.units_total {
            if units < 0 {
                return Err(LedgerError::NegativeUnits);
            }
            if units > line.units_total {
                return Err(LedgerError::StaffUnitsIncrease);
            }
            line.units_total = units;
        }
        Ok(())
    }
}
