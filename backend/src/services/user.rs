//! User lookup service — the role boundary
//!
//! Authentication itself is outside the core; the ledger only needs to know
//! who a user is and whether they hold the administrators role.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{User, UserRole};

/// User service for identity and role lookups
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            role: UserRole::from_db(&row.role),
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get a user by id
    pub async fn get(&self, user_id: Uuid) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, role, is_active, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Ok(row.into())
    }

    /// All active users in the administrators role
    pub async fn list_administrators(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, role, is_active, created_at
            FROM users
            WHERE role = 'administrator' AND is_active = true
            ORDER BY username
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Whether a user holds the administrators role
    pub async fn is_administrator(&self, user_id: Uuid) -> AppResult<bool> {
        let is_admin = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND role = 'administrator')",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(is_admin)
    }
}
