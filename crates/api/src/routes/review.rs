//! Route definitions for the `/reviews` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{assignment, review};
use crate::state::AppState;

/// Routes mounted at `/reviews`.
///
/// ```text
/// GET    /                              -> list_reviews
/// GET    /pending                       -> pending_reviews
/// POST   /batch-review                  -> batch_review
/// POST   /assignments/assign_batch      -> assign_batch
/// GET    /{id}                          -> get_review
/// POST   /{id}/review                   -> act_on_review
/// GET    /{id}/reject-targets           -> reject_targets
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(review::list_reviews))
        .route("/pending", get(review::pending_reviews))
        .route("/batch-review", post(review::batch_review))
        .route("/assignments/assign_batch", post(assignment::assign_batch))
        .route("/{id}", get(review::get_review))
        .route("/{id}/review", post(review::act_on_review))
        .route("/{id}/reject-targets", get(review::reject_targets))
}
