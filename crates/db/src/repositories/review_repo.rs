//! Repository for the `reviews` table.

use ipms_core::transition::{REVIEW_PENDING, REVIEW_REJECTED};
use ipms_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::review::{CreateReview, Review, ReviewDecision};

/// Column list for reviews queries.
const COLUMNS: &str = "id, project_id, phase_instance_id, workflow_node_id, reviewer_id, \
    review_type, review_level, status, is_expert_review, score, score_details, \
    closure_rating, comments, reviewed_at, created_at, updated_at";

/// Optional filters for review listings.
#[derive(Debug, Default)]
pub struct ReviewListFilter<'a> {
    pub project_id: Option<DbId>,
    pub review_type: Option<&'a str>,
    pub review_level: Option<&'a str>,
    pub status: Option<&'a str>,
    pub reviewer_id: Option<DbId>,
}

/// Provides CRUD operations for review tasks.
pub struct ReviewRepo;

impl ReviewRepo {
    /// Find a review by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Review>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reviews WHERE id = $1");
        sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Create a primary review for a node, deduplicated against any
    /// existing pending non-expert review for the same position.
    ///
    /// Returns the existing row when one is already pending.
    pub async fn create_primary(
        pool: &PgPool,
        input: &CreateReview,
    ) -> Result<Review, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let review = Self::create_primary_tx(&mut tx, input).await?;
        tx.commit().await?;
        Ok(review)
    }

    /// Transaction variant of [`create_primary`](Self::create_primary).
    pub async fn create_primary_tx(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateReview,
    ) -> Result<Review, sqlx::Error> {
        let existing = format!(
            "SELECT {COLUMNS} FROM reviews
             WHERE project_id = $1
               AND review_type = $2
               AND review_level = $3
               AND phase_instance_id IS NOT DISTINCT FROM $4
               AND workflow_node_id IS NOT DISTINCT FROM $5
               AND is_expert_review = false
               AND status = '{REVIEW_PENDING}'
             LIMIT 1"
        );
        if let Some(review) = sqlx::query_as::<_, Review>(&existing)
            .bind(input.project_id)
            .bind(&input.review_type)
            .bind(&input.review_level)
            .bind(input.phase_instance_id)
            .bind(input.workflow_node_id)
            .fetch_optional(&mut **tx)
            .await?
        {
            return Ok(review);
        }

        let insert = format!(
            "INSERT INTO reviews
                (project_id, phase_instance_id, workflow_node_id, reviewer_id,
                 review_type, review_level, status, is_expert_review)
             VALUES ($1, $2, $3, $4, $5, $6, '{REVIEW_PENDING}', false)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Review>(&insert)
            .bind(input.project_id)
            .bind(input.phase_instance_id)
            .bind(input.workflow_node_id)
            .bind(input.reviewer_id)
            .bind(&input.review_type)
            .bind(&input.review_level)
            .fetch_one(&mut **tx)
            .await
    }

    /// Create an expert review for one (project, expert) pair at a node.
    ///
    /// Returns `None` when that expert already has a review row for the
    /// exact same position (duplicate assignment is a no-op).
    pub async fn create_expert(
        pool: &PgPool,
        input: &CreateReview,
    ) -> Result<Option<Review>, sqlx::Error> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM reviews
                WHERE project_id = $1
                  AND reviewer_id = $2
                  AND review_type = $3
                  AND phase_instance_id IS NOT DISTINCT FROM $4
                  AND workflow_node_id IS NOT DISTINCT FROM $5
                  AND is_expert_review = true
            )",
        )
        .bind(input.project_id)
        .bind(input.reviewer_id)
        .bind(&input.review_type)
        .bind(input.phase_instance_id)
        .bind(input.workflow_node_id)
        .fetch_one(pool)
        .await?;
        if exists.0 {
            return Ok(None);
        }

        let insert = format!(
            "INSERT INTO reviews
                (project_id, phase_instance_id, workflow_node_id, reviewer_id,
                 review_type, review_level, status, is_expert_review)
             VALUES ($1, $2, $3, $4, $5, $6, '{REVIEW_PENDING}', true)
             RETURNING {COLUMNS}"
        );
        let review = sqlx::query_as::<_, Review>(&insert)
            .bind(input.project_id)
            .bind(input.phase_instance_id)
            .bind(input.workflow_node_id)
            .bind(input.reviewer_id)
            .bind(&input.review_type)
            .bind(&input.review_level)
            .fetch_one(pool)
            .await?;
        Ok(Some(review))
    }

    /// Statuses of every expert review at a node within one attempt.
    pub async fn expert_statuses(
        pool: &PgPool,
        project_id: DbId,
        phase_instance_id: Option<DbId>,
        workflow_node_id: Option<DbId>,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT status FROM reviews
             WHERE project_id = $1
               AND phase_instance_id IS NOT DISTINCT FROM $2
               AND workflow_node_id IS NOT DISTINCT FROM $3
               AND is_expert_review = true",
        )
        .bind(project_id)
        .bind(phase_instance_id)
        .bind(workflow_node_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(s,)| s).collect())
    }

    /// Stamp a review with a decision.
    pub async fn decide_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        status: &str,
        decision: &ReviewDecision,
    ) -> Result<Review, sqlx::Error> {
        let query = format!(
            "UPDATE reviews
             SET status = $2, reviewer_id = $3, comments = $4, score = $5,
                 score_details = $6, closure_rating = COALESCE($7, closure_rating),
                 reviewed_at = NOW(), updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .bind(status)
            .bind(decision.reviewer_id)
            .bind(&decision.comments)
            .bind(decision.score)
            .bind(&decision.score_details)
            .bind(&decision.closure_rating)
            .fetch_one(&mut **tx)
            .await
    }

    /// Delete pending reviews of an attempt at the given nodes.
    /// Used to abandon in-flight reviews past a rejection target.
    pub async fn delete_pending_at_nodes_tx(
        tx: &mut Transaction<'_, Postgres>,
        phase_instance_id: DbId,
        node_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        if node_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(&format!(
            "DELETE FROM reviews
             WHERE phase_instance_id = $1
               AND workflow_node_id = ANY($2)
               AND status = '{REVIEW_PENDING}'"
        ))
        .bind(phase_instance_id)
        .bind(node_ids)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Reject any pending review of an attempt at one node, stamping the
    /// standard restart comment.
    pub async fn reject_pending_at_node_tx(
        tx: &mut Transaction<'_, Postgres>,
        phase_instance_id: DbId,
        node_id: DbId,
        comment: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(&format!(
            "UPDATE reviews
             SET status = '{REVIEW_REJECTED}', comments = $3,
                 reviewed_at = NOW(), updated_at = NOW()
             WHERE phase_instance_id = $1
               AND workflow_node_id = $2
               AND status = '{REVIEW_PENDING}'"
        ))
        .bind(phase_instance_id)
        .bind(node_id)
        .bind(comment)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// List reviews matching the given filter, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &ReviewListFilter<'_>,
    ) -> Result<Vec<Review>, sqlx::Error> {
        let mut conditions: Vec<String> = Vec::new();
        if filter.project_id.is_some() {
            conditions.push(format!("project_id = ${}", conditions.len() + 1));
        }
        if filter.review_type.is_some() {
            conditions.push(format!("review_type = ${}", conditions.len() + 1));
        }
        if filter.review_level.is_some() {
            conditions.push(format!("review_level = ${}", conditions.len() + 1));
        }
        if filter.status.is_some() {
            conditions.push(format!("status = ${}", conditions.len() + 1));
        }
        if filter.reviewer_id.is_some() {
            conditions.push(format!("reviewer_id = ${}", conditions.len() + 1));
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let query =
            format!("SELECT {COLUMNS} FROM reviews{where_clause} ORDER BY created_at DESC");

        let mut stmt = sqlx::query_as::<_, Review>(&query);
        if let Some(project_id) = filter.project_id {
            stmt = stmt.bind(project_id);
        }
        if let Some(review_type) = filter.review_type {
            stmt = stmt.bind(review_type);
        }
        if let Some(review_level) = filter.review_level {
            stmt = stmt.bind(review_level);
        }
        if let Some(status) = filter.status {
            stmt = stmt.bind(status);
        }
        if let Some(reviewer_id) = filter.reviewer_id {
            stmt = stmt.bind(reviewer_id);
        }
        stmt.fetch_all(pool).await
    }

    /// List pending reviews assigned to a reviewer, oldest first.
    pub async fn list_pending_for_reviewer(
        pool: &PgPool,
        reviewer_id: DbId,
    ) -> Result<Vec<Review>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reviews
             WHERE reviewer_id = $1 AND status = '{REVIEW_PENDING}'
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Review>(&query)
            .bind(reviewer_id)
            .fetch_all(pool)
            .await
    }
}
