//! User and role models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user of the ledger. Each user owns at most one account of stock lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_administrator(&self) -> bool {
        self.role == UserRole::Administrator
    }
}

/// The two user levels the ledger distinguishes. Warehouse administrators
/// may edit everything; store staff are restricted to the sale/shrinkage
/// path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Administrator,
    Staff,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Administrator => "administrator",
            UserRole::Staff => "staff",
        }
    }

    /// Parse the database representation; anything unknown maps to the
    /// least-privileged role.
    pub fn from_db(value: &str) -> Self {
        match value {
            "administrator" => UserRole::Administrator,
            _ => UserRole::Staff,
        }
    }
}
