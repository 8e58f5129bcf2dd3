//! Repository for the `projects` and `project_advisors` tables.

use ipms_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::project::Project;

/// Column list for projects queries.
const COLUMNS: &str = "id, title, batch_id, leader_id, status, category_code, level_code, \
    is_key_field, key_domain_code, created_at, updated_at";

/// Provides read and status-update operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Find a project by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Update a project's status within the caller's transaction.
    pub async fn set_status_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        status: &str,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(status)
            .fetch_one(&mut **tx)
            .await
    }

    /// User ids of every advisor attached to a project.
    pub async fn advisor_ids(pool: &PgPool, project_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> =
            sqlx::query_as("SELECT user_id FROM project_advisors WHERE project_id = $1")
                .bind(project_id)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// The college code of a project's leader, for scope routing.
    pub async fn leader_college_code(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT u.college_code FROM projects p
             JOIN users u ON u.id = p.leader_id
             WHERE p.id = $1",
        )
        .bind(project_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.and_then(|(code,)| code))
    }
}
