pub mod health;
pub mod notification;
pub mod project;
pub mod review;
pub mod workflow;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /reviews                                 list (?status, review_type, review_level, project_id, mine)
/// /reviews/pending                         caller's pending queue (GET)
/// /reviews/batch-review                    batch approve/reject (POST)
/// /reviews/assignments/assign_batch        assign expert group (POST)
/// /reviews/{id}                            get (GET)
/// /reviews/{id}/review                     approve/reject (POST)
/// /reviews/{id}/reject-targets             allowed reject targets (GET)
///
/// /projects/{id}/phases/{phase}            list attempts (GET)
/// /projects/{id}/phases/{phase}/submit     submit phase (POST)
///
/// /workflows/{id}/validate                 validate node chain (GET)
///
/// /notifications                           caller's notifications (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Review tasks: actions, queries, expert assignment.
        .nest("/reviews", review::router())
        // Phase attempts per project.
        .nest("/projects", project::router())
        // Workflow definition validation.
        .nest("/workflows", workflow::router())
        // In-app notifications.
        .nest("/notifications", notification::router())
}
