//! Expert group models.

use ipms_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `expert_groups` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExpertGroup {
    pub id: DbId,
    pub name: String,
    /// COLLEGE or SCHOOL.
    pub scope: String,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One group member joined with the user facts eligibility needs.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExpertGroupMember {
    pub user_id: DbId,
    pub display_name: String,
    pub college_code: Option<String>,
    pub is_expert_certified: bool,
}
