//! Review task models.

use ipms_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `reviews` table.
///
/// Either the routed primary review of a node, or one of several
/// parallel expert reviews (`is_expert_review = true`).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Review {
    pub id: DbId,
    pub project_id: DbId,
    /// `NULL` on legacy rows created before phase instances existed.
    pub phase_instance_id: Option<DbId>,
    pub workflow_node_id: Option<DbId>,
    pub reviewer_id: Option<DbId>,
    pub review_type: String,
    pub review_level: String,
    pub status: String,
    pub is_expert_review: bool,
    pub score: Option<i64>,
    pub score_details: Option<serde_json::Value>,
    pub closure_rating: Option<String>,
    pub comments: Option<String>,
    pub reviewed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a review task.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReview {
    pub project_id: DbId,
    pub phase_instance_id: Option<DbId>,
    pub workflow_node_id: Option<DbId>,
    pub reviewer_id: Option<DbId>,
    pub review_type: String,
    pub review_level: String,
    pub is_expert_review: bool,
}

/// Fields stamped when a review is decided.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDecision {
    pub reviewer_id: DbId,
    pub comments: Option<String>,
    pub score: Option<i64>,
    pub score_details: Option<serde_json::Value>,
    pub closure_rating: Option<String>,
}
