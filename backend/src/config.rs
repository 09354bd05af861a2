//! Configuration management for the Stock Ledger
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with STOCK_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::notify::NotificationSettings;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Stock-take scheduling and job configuration
    pub stock_take: StockTakeConfig,

    /// Notification toggles
    pub notifications: NotificationConfig,

    /// Mail API configuration
    pub mail: MailConfig,

    /// Report rendering configuration
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StockTakeConfig {
    /// Seconds between scheduler sweeps over all accounts holding stock
    pub interval_secs: u64,

    /// Timeout applied to one reconciliation attempt
    pub job_timeout_secs: u64,

    /// Attempts per stock-take job. The transaction itself is never
    /// retried; each attempt runs a fresh one.
    pub job_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Master switch; when off, would-be recipients are logged instead
    pub enabled: bool,

    /// Send reports to every administrator
    pub notify_administrators: bool,

    /// Send reports to the account owner
    pub notify_requester: bool,
}

impl NotificationConfig {
    /// The explicit settings value handed to the notification dispatcher.
    pub fn settings(&self) -> NotificationSettings {
        NotificationSettings {
            enabled: self.enabled,
            notify_administrators: self.notify_administrators,
            notify_requester: self.notify_requester,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    /// Mail API endpoint; empty disables the client entirely
    pub api_endpoint: String,

    /// Mail API key
    pub api_key: String,

    /// From address on outbound mail
    pub from_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    /// Currency symbol prefixed to every monetary value in reports
    pub currency_symbol: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("STOCK_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("stock_take.interval_secs", 86_400)?
            .set_default("stock_take.job_timeout_secs", 300)?
            .set_default("stock_take.job_attempts", 1)?
            .set_default("notifications.enabled", true)?
            .set_default("notifications.notify_administrators", true)?
            .set_default("notifications.notify_requester", true)?
            .set_default("mail.api_endpoint", "")?
            .set_default("mail.api_key", "")?
            .set_default("mail.from_address", "stock@example.com")?
            .set_default("report.currency_symbol", "£")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (STOCK_ prefix)
            .add_source(
                Environment::with_prefix("STOCK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
