//! Repository for the `workflow_definitions` and `workflow_nodes` tables.

use ipms_core::types::DbId;
use ipms_core::workflow::{self, NodeDef, Phase};
use sqlx::PgPool;

use crate::models::workflow::{
    CreateWorkflowDefinition, CreateWorkflowNode, WorkflowDefinition, WorkflowNode,
};

/// Column list for workflow_definitions queries.
const DEFINITION_COLUMNS: &str = "id, phase, batch_id, version, is_active, created_at, updated_at";

/// Column list for workflow_nodes queries.
const NODE_COLUMNS: &str = "id, workflow_id, code, name, node_type, role, review_level, \
    require_expert_review, scope, return_policy, allowed_reject_to, scoring_template_id, \
    sort_order, created_at, updated_at";

/// `NODE_COLUMNS` qualified for joins against `workflow_nodes n`.
const NODE_COLUMNS_QUALIFIED: &str = "n.id, n.workflow_id, n.code, n.name, n.node_type, \
    n.role, n.review_level, n.require_expert_review, n.scope, n.return_policy, \
    n.allowed_reject_to, n.scoring_template_id, n.sort_order, n.created_at, n.updated_at";

/// Provides workflow definition storage and chain resolution.
pub struct WorkflowRepo;

impl WorkflowRepo {
    /// Insert a new workflow definition, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateWorkflowDefinition,
    ) -> Result<WorkflowDefinition, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_definitions (phase, batch_id, version, is_active)
             VALUES ($1, $2, $3, $4)
             RETURNING {DEFINITION_COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowDefinition>(&query)
            .bind(&input.phase)
            .bind(input.batch_id)
            .bind(input.version)
            .bind(input.is_active)
            .fetch_one(pool)
            .await
    }

    /// Find a workflow definition by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WorkflowDefinition>, sqlx::Error> {
        let query = format!("SELECT {DEFINITION_COLUMNS} FROM workflow_definitions WHERE id = $1");
        sqlx::query_as::<_, WorkflowDefinition>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a node into a workflow, returning the created row.
    pub async fn create_node(
        pool: &PgPool,
        input: &CreateWorkflowNode,
    ) -> Result<WorkflowNode, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_nodes
                (workflow_id, code, name, node_type, role, review_level,
                 require_expert_review, scope, return_policy, allowed_reject_to,
                 scoring_template_id, sort_order)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {NODE_COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowNode>(&query)
            .bind(input.workflow_id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.node_type)
            .bind(&input.role)
            .bind(&input.review_level)
            .bind(input.require_expert_review)
            .bind(&input.scope)
            .bind(&input.return_policy)
            .bind(&input.allowed_reject_to)
            .bind(input.scoring_template_id)
            .bind(input.sort_order)
            .fetch_one(pool)
            .await
    }

    /// List a workflow's nodes in chain order.
    pub async fn nodes_for_workflow(
        pool: &PgPool,
        workflow_id: DbId,
    ) -> Result<Vec<WorkflowNode>, sqlx::Error> {
        let query = format!(
            "SELECT {NODE_COLUMNS} FROM workflow_nodes
             WHERE workflow_id = $1
             ORDER BY sort_order ASC"
        );
        sqlx::query_as::<_, WorkflowNode>(&query)
            .bind(workflow_id)
            .fetch_all(pool)
            .await
    }

    /// Resolve the node chain for a (phase, batch).
    ///
    /// Prefers the highest-version active definition scoped to the batch,
    /// then a batch-less global active definition, then the hardcoded
    /// default chain. Never returns an empty chain.
    pub async fn resolve_nodes(
        pool: &PgPool,
        phase: Phase,
        batch_id: Option<DbId>,
    ) -> Result<Vec<NodeDef>, sqlx::Error> {
        if let Some(batch_id) = batch_id {
            let nodes = Self::active_nodes(pool, phase, Some(batch_id)).await?;
            if !nodes.is_empty() {
                return Ok(nodes);
            }
        }
        let nodes = Self::active_nodes(pool, phase, None).await?;
        if !nodes.is_empty() {
            return Ok(nodes);
        }
        Ok(workflow::default_nodes(phase))
    }

    /// Nodes of the highest-version active definition for a scope, or
    /// empty when no definition matches.
    async fn active_nodes(
        pool: &PgPool,
        phase: Phase,
        batch_id: Option<DbId>,
    ) -> Result<Vec<NodeDef>, sqlx::Error> {
        let scope_clause = if batch_id.is_some() {
            "w.batch_id = $2"
        } else {
            "w.batch_id IS NULL"
        };
        let query = format!(
            "SELECT {NODE_COLUMNS_QUALIFIED} FROM workflow_nodes n
             JOIN workflow_definitions w ON w.id = n.workflow_id
             WHERE w.phase = $1 AND w.is_active = true AND {scope_clause}
               AND w.version = (
                   SELECT MAX(version) FROM workflow_definitions w2
                   WHERE w2.phase = w.phase AND w2.is_active = true
                     AND w2.batch_id IS NOT DISTINCT FROM w.batch_id
               )
             ORDER BY n.sort_order ASC"
        );
        let mut q = sqlx::query_as::<_, WorkflowNode>(&query).bind(phase.as_str());
        if let Some(batch_id) = batch_id {
            q = q.bind(batch_id);
        }
        let rows = q.fetch_all(pool).await?;
        Ok(rows.iter().map(WorkflowNode::to_node_def).collect())
    }
}
