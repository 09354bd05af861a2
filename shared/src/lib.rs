//! Shared types and domain logic for the Stock Ledger
//!
//! This crate contains the pure core of the system: ledger models, the
//! stock-take reconciliation computation, monetary arithmetic, report
//! rendering and notification recipient resolution. It performs no I/O;
//! persistence and dispatch live in the backend crate.

pub mod models;
pub mod notify;
pub mod report;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
