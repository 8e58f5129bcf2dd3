//! Repository for the `users` table.

use ipms_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::User;

/// Column list for users queries.
const COLUMNS: &str = "id, username, display_name, role, college_code, managed_scope_value, \
    is_expert_certified, is_active, created_at, updated_at";

/// Provides read operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by their ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Any active user holding a role (school-wide single-admin lookup).
    pub async fn find_active_by_role(
        pool: &PgPool,
        role: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE role = $1 AND is_active = true
             ORDER BY id ASC
             LIMIT 1"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(role)
            .fetch_optional(pool)
            .await
    }

    /// The active user holding a role over a managed scope value.
    pub async fn find_by_role_and_scope(
        pool: &PgPool,
        role: &str,
        scope_value: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE role = $1 AND managed_scope_value = $2 AND is_active = true
             LIMIT 1"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(role)
            .bind(scope_value)
            .fetch_optional(pool)
            .await
    }
}
