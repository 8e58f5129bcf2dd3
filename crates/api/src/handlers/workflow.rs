//! Handlers for the `/workflows` resource.

use axum::extract::{Path, State};
use axum::Json;
use ipms_core::error::CoreError;
use ipms_core::types::DbId;
use ipms_core::workflow::{self, NodeDef};
use ipms_db::repositories::WorkflowRepo;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Result of validating a workflow definition's node chain.
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// GET /api/v1/workflows/{id}/validate
///
/// Check a stored workflow definition for structural problems: missing
/// submission or terminal nodes, duplicate codes, reject targets that
/// point forward or out of the chain. Advisory only; a definition with
/// errors is still served.
pub async fn validate_workflow(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(workflow_id): Path<DbId>,
) -> AppResult<Json<ApiResponse<ValidateResponse>>> {
    let definition = WorkflowRepo::find_by_id(&state.pool, workflow_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "workflow definition",
            id: workflow_id,
        }))?;
    let nodes: Vec<NodeDef> = WorkflowRepo::nodes_for_workflow(&state.pool, definition.id)
        .await?
        .into_iter()
        .map(|n| n.to_node_def())
        .collect();
    let errors = workflow::validate_nodes(&nodes);
    Ok(Json(ApiResponse::ok(ValidateResponse {
        valid: errors.is_empty(),
        errors,
    })))
}
