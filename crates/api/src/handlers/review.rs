//! Handlers for the `/reviews` resource.
//!
//! All endpoints require authentication via [`AuthUser`].

use axum::extract::{Path, Query, State};
use axum::Json;
use ipms_core::error::CoreError;
use ipms_core::scoring::ScoreItem;
use ipms_core::types::DbId;
use ipms_core::workflow::NodeDef;
use ipms_db::models::review::Review;
use ipms_db::repositories::{ReviewListFilter, ReviewRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::transition::{self, ApproveParams, RejectParams};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /reviews/{id}/review`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewActionRequest {
    /// Either `approve` or `reject`.
    pub action: String,
    pub comments: Option<String>,
    /// Explicit overall score; overrides the per-item sum when present.
    #[validate(range(min = 0, max = 100, message = "score must be between 0 and 100"))]
    pub score: Option<i64>,
    /// Per-item scores, weighted and summed server-side.
    #[serde(default)]
    pub score_details: Vec<ScoreItem>,
    /// Closure verdict label; only honored during the closure phase.
    pub closure_rating: Option<String>,
    /// Deprecated coarse reject target (`teacher` / `student`); superseded
    /// by `target_node_id`.
    pub reject_to: Option<String>,
    /// Workflow node to send the project back to on rejection.
    pub target_node_id: Option<DbId>,
}

/// Body of `POST /reviews/batch-review`.
#[derive(Debug, Deserialize, Validate)]
pub struct BatchReviewRequest {
    #[validate(length(min = 1, message = "review_ids must not be empty"))]
    pub review_ids: Vec<DbId>,
    #[serde(flatten)]
    #[validate(nested)]
    pub action: ReviewActionRequest,
}

/// One failed row of a batch review.
#[derive(Debug, Serialize)]
pub struct BatchFailure {
    pub id: DbId,
    pub reason: String,
}

/// Outcome of a batch review: per-row, never all-or-nothing.
#[derive(Debug, Serialize)]
pub struct BatchReviewResponse {
    pub success: usize,
    pub failed: Vec<BatchFailure>,
}

/// One node a review may send the project back to.
#[derive(Debug, Serialize)]
pub struct RejectTargetResponse {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub node_type: &'static str,
    pub role: String,
}

impl From<NodeDef> for RejectTargetResponse {
    fn from(node: NodeDef) -> Self {
        RejectTargetResponse {
            id: node.id,
            code: node.code,
            name: node.name,
            node_type: node.node_type.as_str(),
            role: node.role,
        }
    }
}

/// Query parameters for `GET /reviews`.
#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    pub project_id: Option<DbId>,
    pub review_type: Option<String>,
    pub review_level: Option<String>,
    pub status: Option<String>,
    /// If `true`, return only reviews assigned to the caller.
    pub mine: Option<bool>,
}

// ---------------------------------------------------------------------------
// Review actions
// ---------------------------------------------------------------------------

/// Dispatch one review action to the transition engine.
async fn run_action(
    state: &AppState,
    auth: &AuthUser,
    review_id: DbId,
    request: &ReviewActionRequest,
) -> AppResult<Review> {
    match request.action.as_str() {
        "approve" => {
            let params = ApproveParams {
                comments: request.comments.clone(),
                score: request.score,
                score_details: request.score_details.clone(),
                closure_rating: request.closure_rating.clone(),
            };
            transition::approve_review(&state.pool, review_id, auth.user_id, &params).await
        }
        "reject" => {
            let params = RejectParams {
                comments: request.comments.clone(),
                reject_to: request.reject_to.clone(),
                target_node_id: request.target_node_id,
            };
            transition::reject_review(&state.pool, review_id, auth.user_id, &params).await
        }
        other => Err(AppError::BadRequest(format!(
            "unknown review action '{other}', expected 'approve' or 'reject'"
        ))),
    }
}

/// POST /api/v1/reviews/{id}/review
///
/// Approve or reject a single pending review.
pub async fn act_on_review(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(review_id): Path<DbId>,
    Json(body): Json<ReviewActionRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    body.validate()?;
    let review = run_action(&state, &auth, review_id, &body).await?;
    Ok(Json(ApiResponse::ok(review)))
}

/// POST /api/v1/reviews/batch-review
///
/// Apply one action to many reviews. Rows are processed independently:
/// a failing review is reported in `failed` and never blocks the rest.
pub async fn batch_review(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<BatchReviewRequest>,
) -> AppResult<Json<ApiResponse<BatchReviewResponse>>> {
    body.validate()?;
    let mut success = 0;
    let mut failed = Vec::new();
    for &review_id in &body.review_ids {
        match run_action(&state, &auth, review_id, &body.action).await {
            Ok(_) => success += 1,
            Err(err) => failed.push(BatchFailure {
                id: review_id,
                reason: err.to_string(),
            }),
        }
    }
    Ok(Json(ApiResponse::ok(BatchReviewResponse { success, failed })))
}

/// GET /api/v1/reviews/{id}/reject-targets
///
/// List the nodes this review may send the project back to. Empty for
/// reviews whose node declares no targets (legacy fallback applies).
pub async fn reject_targets(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(review_id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Vec<RejectTargetResponse>>>> {
    let targets = transition::reject_targets(&state.pool, review_id)
        .await?
        .into_iter()
        .map(RejectTargetResponse::from)
        .collect();
    Ok(Json(ApiResponse::ok(targets)))
}

// ---------------------------------------------------------------------------
// Review queries
// ---------------------------------------------------------------------------

/// GET /api/v1/reviews
///
/// List reviews with optional status / type / level / project filters.
pub async fn list_reviews(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ReviewListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Review>>>> {
    let filter = ReviewListFilter {
        project_id: params.project_id,
        review_type: params.review_type.as_deref(),
        review_level: params.review_level.as_deref(),
        status: params.status.as_deref(),
        reviewer_id: params.mine.unwrap_or(false).then_some(auth.user_id),
    };
    let reviews = ReviewRepo::list(&state.pool, &filter).await?;
    Ok(Json(ApiResponse::ok(reviews)))
}

/// GET /api/v1/reviews/pending
///
/// The caller's pending review queue, oldest first.
pub async fn pending_reviews(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Review>>>> {
    let reviews = ReviewRepo::list_pending_for_reviewer(&state.pool, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(reviews)))
}

/// GET /api/v1/reviews/{id}
///
/// Fetch a single review.
pub async fn get_review(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(review_id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let review = ReviewRepo::find_by_id(&state.pool, review_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "review",
            id: review_id,
        }))?;
    Ok(Json(ApiResponse::ok(review)))
}
