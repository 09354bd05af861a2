//! Stock Ledger - backend library
//!
//! Persistence services, the stock-take orchestration and the outbound mail
//! client. The pure domain logic lives in the `shared` crate; an HTTP API
//! layer (out of scope here) would consume these services the same way the
//! worker binary does.

pub mod config;
pub mod error;
pub mod external;
pub mod jobs;
pub mod services;

pub use config::Config;
