//! Route definitions for the `/workflows` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::workflow;
use crate::state::AppState;

/// Routes mounted at `/workflows`.
///
/// ```text
/// GET    /{id}/validate   -> validate_workflow
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/validate", get(workflow::validate_workflow))
}
