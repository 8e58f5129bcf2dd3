//! Repository for the `phase_instances` table.

use ipms_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::phase_instance::{
    CreatePhaseInstance, PhaseInstance, STATE_COMPLETED, STATE_IN_PROGRESS,
};

/// Column list for phase_instances queries.
const COLUMNS: &str = "id, project_id, phase, attempt_no, current_node_id, step, state, \
    return_to, returned_reason, returned_at, created_by, created_at, updated_at";

/// Provides CRUD operations for phase attempts.
pub struct PhaseInstanceRepo;

impl PhaseInstanceRepo {
    /// Insert a new phase attempt, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreatePhaseInstance,
    ) -> Result<PhaseInstance, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let instance = Self::create_tx(&mut tx, input).await?;
        tx.commit().await?;
        Ok(instance)
    }

    /// Insert a new phase attempt within the caller's transaction.
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreatePhaseInstance,
    ) -> Result<PhaseInstance, sqlx::Error> {
        let query = format!(
            "INSERT INTO phase_instances
                (project_id, phase, attempt_no, current_node_id, step, state, created_by)
             VALUES ($1, $2, $3, $4, $5, '{STATE_IN_PROGRESS}', $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PhaseInstance>(&query)
            .bind(input.project_id)
            .bind(&input.phase)
            .bind(input.attempt_no)
            .bind(input.current_node_id)
            .bind(&input.step)
            .bind(input.created_by)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find a phase attempt by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<PhaseInstance>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM phase_instances WHERE id = $1");
        sqlx::query_as::<_, PhaseInstance>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The active (non-completed) attempt for a project's phase, if any.
    pub async fn find_active(
        pool: &PgPool,
        project_id: DbId,
        phase: &str,
    ) -> Result<Option<PhaseInstance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM phase_instances
             WHERE project_id = $1 AND phase = $2 AND state <> '{STATE_COMPLETED}'
             ORDER BY attempt_no DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, PhaseInstance>(&query)
            .bind(project_id)
            .bind(phase)
            .fetch_optional(pool)
            .await
    }

    /// The highest attempt number recorded for a project's phase, or 0.
    pub async fn max_attempt_no(
        pool: &PgPool,
        project_id: DbId,
        phase: &str,
    ) -> Result<i32, sqlx::Error> {
        let row: (i32,) = sqlx::query_as(
            "SELECT COALESCE(MAX(attempt_no), 0) FROM phase_instances \
             WHERE project_id = $1 AND phase = $2",
        )
        .bind(project_id)
        .bind(phase)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// List every attempt of a project's phase, oldest first.
    pub async fn list_for_phase(
        pool: &PgPool,
        project_id: DbId,
        phase: &str,
    ) -> Result<Vec<PhaseInstance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM phase_instances
             WHERE project_id = $1 AND phase = $2
             ORDER BY attempt_no ASC"
        );
        sqlx::query_as::<_, PhaseInstance>(&query)
            .bind(project_id)
            .bind(phase)
            .fetch_all(pool)
            .await
    }

    /// Move an attempt to a new node. The `step` cache is written in the
    /// same statement as `current_node_id`.
    pub async fn set_position_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        node_id: DbId,
        step: &str,
    ) -> Result<PhaseInstance, sqlx::Error> {
        let query = format!(
            "UPDATE phase_instances
             SET current_node_id = $2, step = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PhaseInstance>(&query)
            .bind(id)
            .bind(node_id)
            .bind(step)
            .fetch_one(&mut **tx)
            .await
    }

    /// Mark an attempt completed.
    pub async fn mark_completed_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<PhaseInstance, sqlx::Error> {
        let query = format!(
            "UPDATE phase_instances
             SET state = '{STATE_COMPLETED}', updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PhaseInstance>(&query)
            .bind(id)
            .fetch_one(&mut **tx)
            .await
    }

    /// Mark an attempt returned, recording who it went back to and why.
    pub async fn mark_returned_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        return_to: &str,
        reason: Option<&str>,
    ) -> Result<PhaseInstance, sqlx::Error> {
        let query = format!(
            "UPDATE phase_instances
             SET state = 'RETURNED', return_to = $2, returned_reason = $3,
                 returned_at = NOW(), updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PhaseInstance>(&query)
            .bind(id)
            .bind(return_to)
            .bind(reason)
            .fetch_one(&mut **tx)
            .await
    }
}
