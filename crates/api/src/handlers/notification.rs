//! Handlers for the `/notifications` resource.

use axum::extract::State;
use axum::Json;
use ipms_db::models::notification::Notification;
use ipms_db::repositories::NotificationRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/notifications
///
/// The caller's notifications, newest first.
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Notification>>>> {
    let notifications = NotificationRepo::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(notifications)))
}
