//! Project models.

use ipms_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub title: String,
    pub batch_id: Option<DbId>,
    pub leader_id: DbId,
    pub status: String,
    /// Dictionary codes used for admin scope routing.
    pub category_code: Option<String>,
    pub level_code: Option<String>,
    pub is_key_field: bool,
    pub key_domain_code: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
