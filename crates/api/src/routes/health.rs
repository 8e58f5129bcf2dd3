//! Liveness endpoint, mounted at root level rather than under `/api/v1`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
}

/// GET /health -- service liveness plus a database round-trip.
///
/// Returns 503 when the database is unreachable so load balancers can
/// take the instance out of rotation.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_up = ipms_db::health_check(&state.pool).await.is_ok();
    let (code, status, database) = if db_up {
        (StatusCode::OK, "ok", "up")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "down")
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
