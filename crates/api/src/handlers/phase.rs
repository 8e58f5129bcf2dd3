//! Handlers for phase attempts under `/projects/{id}/phases`.

use axum::extract::{Path, State};
use axum::Json;
use ipms_core::types::DbId;
use ipms_core::workflow::Phase;
use ipms_db::models::phase_instance::PhaseInstance;
use ipms_db::repositories::PhaseInstanceRepo;

use crate::engine::transition;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

fn parse_phase(raw: &str) -> AppResult<Phase> {
    Phase::parse(raw).ok_or_else(|| AppError::BadRequest(format!("unknown phase '{raw}'")))
}

/// POST /api/v1/projects/{id}/phases/{phase}/submit
///
/// Submit a phase for review. Creates the attempt if none is active,
/// moves it past the submission node, and opens the first review.
pub async fn submit_phase(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((project_id, phase)): Path<(DbId, String)>,
) -> AppResult<Json<ApiResponse<PhaseInstance>>> {
    let phase = parse_phase(&phase)?;
    let instance =
        transition::submit_phase(&state.pool, project_id, phase, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(instance)))
}

/// GET /api/v1/projects/{id}/phases/{phase}
///
/// List every attempt of a project's phase, oldest first.
pub async fn list_attempts(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((project_id, phase)): Path<(DbId, String)>,
) -> AppResult<Json<ApiResponse<Vec<PhaseInstance>>>> {
    let phase = parse_phase(&phase)?;
    let attempts =
        PhaseInstanceRepo::list_for_phase(&state.pool, project_id, phase.as_str()).await?;
    Ok(Json(ApiResponse::ok(attempts)))
}
