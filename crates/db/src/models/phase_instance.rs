//! Phase instance (attempt) models.

use ipms_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Phase instance lifecycle states.
pub const STATE_IN_PROGRESS: &str = "IN_PROGRESS";
pub const STATE_RETURNED: &str = "RETURNED";
pub const STATE_COMPLETED: &str = "COMPLETED";

/// A row from the `phase_instances` table.
///
/// One row per (project, phase, attempt); rejections spawn a fresh
/// attempt and the old row stays as history.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PhaseInstance {
    pub id: DbId,
    pub project_id: DbId,
    pub phase: String,
    pub attempt_no: i32,
    /// Position in the node chain. `NULL` for legacy rows predating the
    /// node graph.
    pub current_node_id: Option<DbId>,
    /// Denormalized cache of the current node's code; always written
    /// together with `current_node_id`.
    pub step: String,
    pub state: String,
    pub return_to: String,
    pub returned_reason: Option<String>,
    pub returned_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a phase instance.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePhaseInstance {
    pub project_id: DbId,
    pub phase: String,
    pub attempt_no: i32,
    pub current_node_id: Option<DbId>,
    pub step: String,
    pub created_by: Option<DbId>,
}
