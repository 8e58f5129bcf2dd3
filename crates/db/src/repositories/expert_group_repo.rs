//! Repository for the `expert_groups` and `expert_group_members` tables.

use ipms_core::types::DbId;
use sqlx::PgPool;

use crate::models::expert_group::{ExpertGroup, ExpertGroupMember};

/// Column list for expert_groups queries.
const COLUMNS: &str = "id, name, scope, created_by, created_at, updated_at";

/// Provides read operations for expert groups.
pub struct ExpertGroupRepo;

impl ExpertGroupRepo {
    /// Find a group by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ExpertGroup>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM expert_groups WHERE id = $1");
        sqlx::query_as::<_, ExpertGroup>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a group's members joined with the user facts eligibility
    /// checks need, ordered by name.
    pub async fn members(pool: &PgPool, group_id: DbId) -> Result<Vec<ExpertGroupMember>, sqlx::Error> {
        sqlx::query_as::<_, ExpertGroupMember>(
            "SELECT u.id AS user_id, u.display_name, u.college_code, u.is_expert_certified
             FROM expert_group_members m
             JOIN users u ON u.id = m.user_id
             WHERE m.group_id = $1
             ORDER BY u.display_name ASC",
        )
        .bind(group_id)
        .fetch_all(pool)
        .await
    }
}
