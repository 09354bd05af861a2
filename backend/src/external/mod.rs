//! External service integrations

pub mod mail;

pub use mail::{MailApiClient, OutboundEmail};
