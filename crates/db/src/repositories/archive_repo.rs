//! Repository for the `project_archives` table.

use ipms_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::archive::ProjectArchive;

/// Column list for project_archives queries.
const COLUMNS: &str = "id, project_id, snapshot, created_at";

/// Provides snapshot storage for closed projects.
pub struct ArchiveRepo;

impl ArchiveRepo {
    /// Create a snapshot for a project unless one already exists.
    /// Returns the row either way.
    pub async fn ensure_snapshot_tx(
        tx: &mut Transaction<'_, Postgres>,
        project_id: DbId,
        snapshot: &serde_json::Value,
    ) -> Result<ProjectArchive, sqlx::Error> {
        let existing = format!(
            "SELECT {COLUMNS} FROM project_archives WHERE project_id = $1 LIMIT 1"
        );
        if let Some(archive) = sqlx::query_as::<_, ProjectArchive>(&existing)
            .bind(project_id)
            .fetch_optional(&mut **tx)
            .await?
        {
            return Ok(archive);
        }

        let insert = format!(
            "INSERT INTO project_archives (project_id, snapshot)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectArchive>(&insert)
            .bind(project_id)
            .bind(snapshot)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find a project's snapshot, if any.
    pub async fn find_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Option<ProjectArchive>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM project_archives WHERE project_id = $1");
        sqlx::query_as::<_, ProjectArchive>(&query)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }
}
