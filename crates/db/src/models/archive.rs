//! Project archive snapshot models.

use ipms_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `project_archives` table: a frozen JSON snapshot of a
/// project taken when its closure phase completes.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectArchive {
    pub id: DbId,
    pub project_id: DbId,
    pub snapshot: serde_json::Value,
    pub created_at: Timestamp,
}
