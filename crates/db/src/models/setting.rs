//! System setting models.

use ipms_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `system_settings` table. Values are free-form JSON
/// keyed by a unique code (review windows, review rules).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SystemSetting {
    pub id: DbId,
    pub code: String,
    pub value: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
