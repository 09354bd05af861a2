//! Warehouse stock model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A SKU held in the warehouse, before any transfer to an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseItem {
    pub id: Uuid,
    pub sku: String,
    pub description: String,
    pub units_total: i64,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WarehouseError {
    #[error("transfers must cover a positive number of units")]
    NonPositiveUnits,

    #[error(
        "your request to transfer {requested} units of {sku} exceeds the {available} we currently have in the warehouse"
    )]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },
}

impl WarehouseItem {
    /// Take `units` out of the warehouse for a transfer. The warehouse count
    /// never goes negative; a violation is a validation error.
    pub fn withdraw(&mut self, units: i64) -> Result<(), WarehouseError> {
        if units <= 0 {
            return Err(WarehouseError::NonPositiveUnits);
        }
        if units > self.units_total {
            return Err(WarehouseError::InsufficientStock {
                sku: self.sku.clone(),
                available: self.units_total,
                requested: units,
            });
        }
        self.units_total -= units;
        Ok(())
    }
}
