//! Bearer-token extractor.
//!
//! Handlers take [`AuthUser`] as a parameter; requests without a valid
//! token are rejected with 401 before the handler body runs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ipms_core::error::CoreError;
use ipms_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Identity taken from the request's `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    /// Role code from the token, e.g. `"TEACHER"` or `"LEVEL1_ADMIN"`.
    pub role: String,
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.to_string()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthorized("Authorization header must be 'Bearer <token>'"))?;

        let claims = validate_token(token, &state.config.jwt)
            .map_err(|_| unauthorized("invalid or expired token"))?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}
