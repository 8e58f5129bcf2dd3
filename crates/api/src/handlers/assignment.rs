//! Handlers for expert assignment under `/reviews/assignments`.

use axum::extract::State;
use axum::Json;
use ipms_core::types::DbId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::assignment::{self, AssignBatchParams};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Body of `POST /reviews/assignments/assign_batch`.
#[derive(Debug, Deserialize, Validate)]
pub struct AssignBatchRequest {
    #[validate(length(min = 1, message = "project_ids must not be empty"))]
    pub project_ids: Vec<DbId>,
    pub group_id: DbId,
    /// Phase code the assignment belongs to.
    pub review_type: String,
    /// Review level for node-less legacy attempts; defaults to the
    /// caller's own level.
    pub review_level: Option<String>,
    /// Node the experts review at; defaults to each project's current node.
    pub target_node_id: Option<DbId>,
}

/// One project that could not be assigned.
#[derive(Debug, Serialize)]
pub struct AssignFailureRow {
    pub id: DbId,
    pub reason: String,
}

/// Outcome of a batch assignment.
#[derive(Debug, Serialize)]
pub struct AssignBatchResponse {
    /// Number of expert reviews created (duplicates are skipped).
    pub count: usize,
    /// Projects skipped by per-row validation, with the reason each.
    pub failed: Vec<AssignFailureRow>,
}

/// POST /api/v1/reviews/assignments/assign_batch
///
/// Assign every member of an expert group to a set of projects.
/// Projects are validated independently: an ineligible project lands in
/// `failed` and never blocks the rest, and retrying skips assignments
/// that already exist.
pub async fn assign_batch(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<AssignBatchRequest>,
) -> AppResult<Json<ApiResponse<AssignBatchResponse>>> {
    body.validate()?;
    let params = AssignBatchParams {
        project_ids: body.project_ids,
        group_id: body.group_id,
        review_type: body.review_type,
        review_level: body.review_level,
        target_node_id: body.target_node_id,
    };
    let outcome = assignment::assign_group(&state.pool, &auth, &params).await?;
    let failed: Vec<AssignFailureRow> = outcome
        .failures
        .into_iter()
        .map(|f| AssignFailureRow {
            id: f.project_id,
            reason: f.reason,
        })
        .collect();
    Ok(Json(ApiResponse::with_message(
        format!("assigned {} expert reviews", outcome.created),
        AssignBatchResponse {
            count: outcome.created,
            failed,
        },
    )))
}
