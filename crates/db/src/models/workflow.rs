//! Workflow definition and node models.

use ipms_core::types::{DbId, Timestamp};
use ipms_core::workflow::{ExpertScope, NodeDef, NodeType, ReturnPolicy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `workflow_definitions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowDefinition {
    pub id: DbId,
    pub phase: String,
    /// `NULL` means a global definition applying to every batch.
    pub batch_id: Option<DbId>,
    pub version: i32,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `workflow_nodes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowNode {
    pub id: DbId,
    pub workflow_id: DbId,
    pub code: String,
    pub name: String,
    pub node_type: String,
    pub role: String,
    pub review_level: String,
    pub require_expert_review: bool,
    pub scope: Option<String>,
    pub return_policy: String,
    pub allowed_reject_to: Vec<DbId>,
    pub scoring_template_id: Option<DbId>,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WorkflowNode {
    /// Convert a stored row into the engine's node shape.
    ///
    /// Unparseable type/policy strings degrade to REVIEW / NONE rather
    /// than failing the whole chain load; the advisory validator is the
    /// place that surfaces bad configuration.
    pub fn to_node_def(&self) -> NodeDef {
        NodeDef {
            id: self.id,
            code: self.code.clone(),
            name: self.name.clone(),
            node_type: NodeType::parse(&self.node_type).unwrap_or(NodeType::Review),
            role: self.role.clone(),
            review_level: self.review_level.clone(),
            require_expert_review: self.require_expert_review,
            scope: self.scope.as_deref().and_then(ExpertScope::parse),
            return_policy: ReturnPolicy::parse(&self.return_policy).unwrap_or(ReturnPolicy::None),
            allowed_reject_to: self.allowed_reject_to.clone(),
            sort_order: self.sort_order,
        }
    }
}

/// DTO for creating a workflow definition.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkflowDefinition {
    pub phase: String,
    pub batch_id: Option<DbId>,
    pub version: i32,
    pub is_active: bool,
}

/// DTO for creating a workflow node.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkflowNode {
    pub workflow_id: DbId,
    pub code: String,
    pub name: String,
    pub node_type: String,
    pub role: String,
    pub review_level: String,
    pub require_expert_review: bool,
    pub scope: Option<String>,
    pub return_policy: String,
    pub allowed_reject_to: Vec<DbId>,
    pub scoring_template_id: Option<DbId>,
    pub sort_order: i32,
}
