//! Error handling for the Stock Ledger

use shared::models::{LedgerError, WarehouseError};
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors, surfaced synchronously to the caller of an edit path
    #[error("validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    // Orchestration errors
    #[error("account {0} is locked by a stock take in progress")]
    AccountLocked(Uuid),

    #[error("stock take timed out after {0} seconds")]
    Timeout(u64),

    // External collaborator errors
    #[error("mail dispatch failed: {0}")]
    Mail(String),

    // Database errors
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    // Internal errors
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientStock { .. } => AppError::InsufficientStock(err.to_string()),
            LedgerError::StaffUnitsIncrease => AppError::Unauthorized(err.to_string()),
            LedgerError::NonPositiveUnits | LedgerError::NegativeUnits => AppError::Validation {
                field: "units".to_string(),
                message: err.to_string(),
            },
            LedgerError::InvalidPrice => AppError::Validation {
                field: "price".to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl From<WarehouseError> for AppError {
    fn from(err: WarehouseError) -> Self {
        match err {
            WarehouseError::InsufficientStock { .. } => {
                AppError::InsufficientStock(err.to_string())
            }
            WarehouseError::NonPositiveUnits => AppError::Validation {
                field: "units".to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "input".to_string());
        AppError::Validation {
            field,
            message: errors.to_string(),
        }
    }
}

/// Result type alias for services
pub type AppResult<T> = Result<T, AppError>;
