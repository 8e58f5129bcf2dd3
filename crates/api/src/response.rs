//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "code": ..., "message": ..., "data": ... }`
//! envelope for compatibility with existing clients. Use [`ApiResponse`]
//! instead of ad-hoc `serde_json::json!` blocks to get compile-time type
//! safety and consistent serialization.

use serde::Serialize;

/// Standard `{ code, message, data }` response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// A successful envelope (`code = 0`, `message = "ok"`).
    pub fn ok(data: T) -> Self {
        Self {
            code: 0,
            message: "ok".to_string(),
            data,
        }
    }

    /// A successful envelope with a custom human-readable message.
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            code: 0,
            message: message.into(),
            data,
        }
    }
}
