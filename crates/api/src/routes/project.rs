//! Route definitions for project-scoped phase attempts.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::phase;
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /{id}/phases/{phase}          -> list_attempts
/// POST   /{id}/phases/{phase}/submit   -> submit_phase
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/phases/{phase}", get(phase::list_attempts))
        .route("/{id}/phases/{phase}/submit", post(phase::submit_phase))
}
