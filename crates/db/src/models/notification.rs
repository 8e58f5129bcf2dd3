//! Notification models.

use ipms_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: Timestamp,
}

/// DTO for creating a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotification {
    pub user_id: DbId,
    pub title: String,
    pub body: String,
}
