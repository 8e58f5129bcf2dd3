//! User models.

use ipms_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub college_code: Option<String>,
    /// For scoped admins, the dictionary value they administer
    /// (a college code, category code, level code, or key-domain code).
    pub managed_scope_value: Option<String>,
    pub is_expert_certified: bool,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
