//! Workflow node model, default topologies, and chain lookups.
//!
//! A project phase moves through an ordered chain of [`NodeDef`]s. Chains
//! are normally configured per batch in the database; when a batch has no
//! active configuration, the hardcoded default chains here act as a
//! safety net. All lookups in this module are pure reads over a resolved
//! node slice.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// A top-level stage of a project's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Application,
    MidTerm,
    Closure,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Application, Phase::MidTerm, Phase::Closure];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Application => "APPLICATION",
            Phase::MidTerm => "MID_TERM",
            Phase::Closure => "CLOSURE",
        }
    }

    pub fn parse(s: &str) -> Option<Phase> {
        match s {
            "APPLICATION" => Some(Phase::Application),
            "MID_TERM" => Some(Phase::MidTerm),
            "CLOSURE" => Some(Phase::Closure),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of step a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    /// Student submission. Always the first node of a chain.
    Submit,
    /// A routed single-reviewer step (e.g. advisor review).
    Review,
    /// Deprecated standalone expert step; kept only so old rows still
    /// deserialize. New chains use `require_expert_review` instead.
    ExpertReview,
    /// An admin approval step.
    Approval,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Submit => "SUBMIT",
            NodeType::Review => "REVIEW",
            NodeType::ExpertReview => "EXPERT_REVIEW",
            NodeType::Approval => "APPROVAL",
        }
    }

    pub fn parse(s: &str) -> Option<NodeType> {
        match s {
            "SUBMIT" => Some(NodeType::Submit),
            "REVIEW" => Some(NodeType::Review),
            "EXPERT_REVIEW" => Some(NodeType::ExpertReview),
            "APPROVAL" => Some(NodeType::Approval),
            _ => None,
        }
    }

    /// Whether a node of this type carries a primary review task.
    pub fn carries_review(&self) -> bool {
        matches!(self, NodeType::Review | NodeType::Approval)
    }
}

/// Where a rejection at this node sends the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnPolicy {
    None,
    Student,
    Teacher,
    Previous,
}

impl ReturnPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnPolicy::None => "NONE",
            ReturnPolicy::Student => "STUDENT",
            ReturnPolicy::Teacher => "TEACHER",
            ReturnPolicy::Previous => "PREVIOUS",
        }
    }

    pub fn parse(s: &str) -> Option<ReturnPolicy> {
        match s {
            "NONE" => Some(ReturnPolicy::None),
            "STUDENT" => Some(ReturnPolicy::Student),
            "TEACHER" => Some(ReturnPolicy::Teacher),
            "PREVIOUS" => Some(ReturnPolicy::Previous),
            _ => None,
        }
    }
}

/// Which expert pool a node's expert review draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpertScope {
    College,
    School,
}

impl ExpertScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpertScope::College => "COLLEGE",
            ExpertScope::School => "SCHOOL",
        }
    }

    pub fn parse(s: &str) -> Option<ExpertScope> {
        match s {
            "COLLEGE" => Some(ExpertScope::College),
            "SCHOOL" => Some(ExpertScope::School),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Node definition
// ---------------------------------------------------------------------------

/// The student role code. Only SUBMIT nodes may use it.
pub const ROLE_STUDENT: &str = "STUDENT";
/// The advisor role code.
pub const ROLE_TEACHER: &str = "TEACHER";
/// College-level (second-tier) admin role code.
pub const ROLE_LEVEL2_ADMIN: &str = "LEVEL2_ADMIN";
/// School-level (first-tier) admin role code.
pub const ROLE_LEVEL1_ADMIN: &str = "LEVEL1_ADMIN";

/// One resolved step in a phase's approval chain.
///
/// Rows loaded from the database and entries of the hardcoded default
/// chains both resolve to this shape, so the engine never cares where a
/// chain came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub node_type: NodeType,
    /// Role code responsible for this node.
    pub role: String,
    /// Review-level label stamped on reviews created at this node.
    /// Free-form; falls back to `role` when empty.
    pub review_level: String,
    pub require_expert_review: bool,
    pub scope: Option<ExpertScope>,
    pub return_policy: ReturnPolicy,
    /// Ids of nodes this node may reject back to, within the same chain.
    pub allowed_reject_to: Vec<DbId>,
    pub sort_order: i32,
}

impl NodeDef {
    /// The review-level label for reviews created at this node.
    pub fn effective_review_level(&self) -> &str {
        if self.review_level.is_empty() {
            &self.role
        } else {
            &self.review_level
        }
    }
}

// ---------------------------------------------------------------------------
// Default topologies
// ---------------------------------------------------------------------------

// Default node ids are negative so they can never alias a database row.
const DEFAULT_ID_BASE_APPLICATION: DbId = -100;
const DEFAULT_ID_BASE_MID_TERM: DbId = -200;
const DEFAULT_ID_BASE_CLOSURE: DbId = -300;

fn submit_node(id: DbId, name: &str) -> NodeDef {
    NodeDef {
        id,
        code: "STUDENT_SUBMIT".into(),
        name: name.into(),
        node_type: NodeType::Submit,
        role: ROLE_STUDENT.into(),
        review_level: String::new(),
        require_expert_review: false,
        scope: None,
        return_policy: ReturnPolicy::None,
        allowed_reject_to: Vec::new(),
        sort_order: 0,
    }
}

fn teacher_review_node(id: DbId, reject_to: DbId) -> NodeDef {
    NodeDef {
        id,
        code: "TEACHER_REVIEW".into(),
        name: "Advisor review".into(),
        node_type: NodeType::Review,
        role: ROLE_TEACHER.into(),
        review_level: "TEACHER".into(),
        require_expert_review: false,
        scope: None,
        return_policy: ReturnPolicy::Student,
        allowed_reject_to: vec![reject_to],
        sort_order: 1,
    }
}

#[allow(clippy::too_many_arguments)]
fn approval_node(
    id: DbId,
    code: &str,
    name: &str,
    role: &str,
    review_level: &str,
    scope: ExpertScope,
    return_policy: ReturnPolicy,
    reject_to: DbId,
    sort_order: i32,
) -> NodeDef {
    NodeDef {
        id,
        code: code.into(),
        name: name.into(),
        node_type: NodeType::Approval,
        role: role.into(),
        review_level: review_level.into(),
        require_expert_review: true,
        scope: Some(scope),
        return_policy,
        allowed_reject_to: vec![reject_to],
        sort_order,
    }
}

/// The hardcoded fallback chain for a phase, used when no active
/// workflow configuration exists for a batch.
pub fn default_nodes(phase: Phase) -> Vec<NodeDef> {
    match phase {
        Phase::Application => {
            let b = DEFAULT_ID_BASE_APPLICATION;
            vec![
                submit_node(b, "Student submits application"),
                teacher_review_node(b - 1, b),
                approval_node(
                    b - 2,
                    "COLLEGE_REVIEW",
                    "College review",
                    ROLE_LEVEL2_ADMIN,
                    "LEVEL2",
                    ExpertScope::College,
                    ReturnPolicy::Previous,
                    b - 1,
                    2,
                ),
                approval_node(
                    b - 3,
                    "SCHOOL_PUBLISH",
                    "School publication",
                    ROLE_LEVEL1_ADMIN,
                    "LEVEL1",
                    ExpertScope::School,
                    ReturnPolicy::Previous,
                    b - 2,
                    3,
                ),
            ]
        }
        Phase::MidTerm => {
            let b = DEFAULT_ID_BASE_MID_TERM;
            vec![
                submit_node(b, "Student submits mid-term report"),
                teacher_review_node(b - 1, b),
                approval_node(
                    b - 2,
                    "COLLEGE_FINALIZE",
                    "College confirmation",
                    ROLE_LEVEL2_ADMIN,
                    "LEVEL2",
                    ExpertScope::College,
                    ReturnPolicy::Student,
                    b - 1,
                    2,
                ),
            ]
        }
        Phase::Closure => {
            let b = DEFAULT_ID_BASE_CLOSURE;
            vec![
                submit_node(b, "Student submits closure report"),
                teacher_review_node(b - 1, b),
                approval_node(
                    b - 2,
                    "COLLEGE_REVIEW",
                    "College review",
                    ROLE_LEVEL2_ADMIN,
                    "LEVEL2",
                    ExpertScope::College,
                    ReturnPolicy::Previous,
                    b - 1,
                    2,
                ),
                approval_node(
                    b - 3,
                    "SCHOOL_FINALIZE",
                    "School closure confirmation",
                    ROLE_LEVEL1_ADMIN,
                    "LEVEL1",
                    ExpertScope::School,
                    ReturnPolicy::Student,
                    b - 2,
                    3,
                ),
            ]
        }
    }
}

// ---------------------------------------------------------------------------
// Chain lookups
// ---------------------------------------------------------------------------

/// Find a node by id within a resolved chain.
pub fn find_by_id(nodes: &[NodeDef], id: DbId) -> Option<&NodeDef> {
    nodes.iter().find(|n| n.id == id)
}

/// Find a node by code within a resolved chain.
pub fn find_by_code<'a>(nodes: &'a [NodeDef], code: &str) -> Option<&'a NodeDef> {
    nodes.iter().find(|n| n.code == code)
}

/// The first node of the chain (the student submission node).
pub fn initial_node(nodes: &[NodeDef]) -> Option<&NodeDef> {
    nodes.first()
}

/// The node after `current_id`, or `None` at the end of the chain.
pub fn next_node(nodes: &[NodeDef], current_id: DbId) -> Option<&NodeDef> {
    let idx = nodes.iter().position(|n| n.id == current_id)?;
    nodes.get(idx + 1)
}

/// The node before `current_id`, or `None` at the start of the chain.
pub fn previous_node(nodes: &[NodeDef], current_id: DbId) -> Option<&NodeDef> {
    let idx = nodes.iter().position(|n| n.id == current_id)?;
    idx.checked_sub(1).and_then(|i| nodes.get(i))
}

/// The first expert-review node matching a review level and scope.
pub fn find_expert_node<'a>(
    nodes: &'a [NodeDef],
    review_level: &str,
    scope: Option<ExpertScope>,
) -> Option<&'a NodeDef> {
    nodes.iter().find(|n| {
        n.require_expert_review
            && n.effective_review_level() == review_level
            && (scope.is_none() || n.scope == scope)
    })
}

/// Resolve a node's `allowed_reject_to` ids to full definitions,
/// preserving chain order. Unknown ids are skipped.
pub fn reject_targets<'a>(nodes: &'a [NodeDef], current: &NodeDef) -> Vec<&'a NodeDef> {
    nodes
        .iter()
        .filter(|n| current.allowed_reject_to.contains(&n.id))
        .collect()
}

// ---------------------------------------------------------------------------
// Advisory validation
// ---------------------------------------------------------------------------

/// Validate a configured chain, returning one message per problem.
///
/// This is advisory: configuration UIs surface the list, the engine does
/// not enforce it transactionally.
pub fn validate_nodes(nodes: &[NodeDef]) -> Vec<String> {
    let mut errors = Vec::new();

    if nodes.is_empty() {
        errors.push("a workflow needs at least one node".to_string());
        return errors;
    }

    let first = &nodes[0];
    if first.node_type != NodeType::Submit {
        errors.push("the first node must be a student submission node (SUBMIT type)".to_string());
    }

    let submit_count = nodes
        .iter()
        .filter(|n| n.node_type == NodeType::Submit)
        .count();
    if submit_count != 1 {
        errors.push("a workflow must contain exactly one submission node (SUBMIT type)".to_string());
    }

    if first.node_type == NodeType::Submit {
        if first.role != ROLE_STUDENT {
            errors.push("the submission node's role must be STUDENT".to_string());
        }
        if !first.allowed_reject_to.is_empty() {
            errors.push("the submission node must not allow rejection".to_string());
        }
        if first.require_expert_review {
            errors.push("the submission node cannot require expert review".to_string());
        }
    }

    let order: std::collections::HashMap<DbId, usize> =
        nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();

    for (idx, node) in nodes.iter().enumerate().skip(1) {
        if node.role == ROLE_STUDENT {
            errors.push(format!(
                "node '{}' (position {}): review nodes cannot use the student role",
                node.name,
                idx + 1
            ));
        }

        for target_id in &node.allowed_reject_to {
            match order.get(target_id) {
                None => errors.push(format!(
                    "node '{}': reject target node id {} does not exist in this workflow",
                    node.name, target_id
                )),
                Some(&target_idx) if target_idx >= idx => errors.push(format!(
                    "node '{}': reject targets must be earlier nodes",
                    node.name
                )),
                Some(_) => {}
            }
        }

        if node.node_type == NodeType::ExpertReview {
            errors.push(format!(
                "node '{}': the EXPERT_REVIEW node type is deprecated, use the expert review flag",
                node.name
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chains_start_with_submit() {
        for phase in Phase::ALL {
            let nodes = default_nodes(phase);
            assert_eq!(nodes[0].node_type, NodeType::Submit, "{phase}");
            assert_eq!(nodes[0].sort_order, 0);
        }
    }

    #[test]
    fn test_default_application_chain_sequence() {
        let nodes = default_nodes(Phase::Application);
        let codes: Vec<&str> = nodes.iter().map(|n| n.code.as_str()).collect();
        assert_eq!(
            codes,
            ["STUDENT_SUBMIT", "TEACHER_REVIEW", "COLLEGE_REVIEW", "SCHOOL_PUBLISH"]
        );
    }

    #[test]
    fn test_default_mid_term_chain_is_three_nodes() {
        let nodes = default_nodes(Phase::MidTerm);
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[2].code, "COLLEGE_FINALIZE");
        assert!(nodes[2].require_expert_review);
    }

    #[test]
    fn test_default_closure_chain_sequence() {
        let nodes = default_nodes(Phase::Closure);
        let codes: Vec<&str> = nodes.iter().map(|n| n.code.as_str()).collect();
        assert_eq!(
            codes,
            ["STUDENT_SUBMIT", "TEACHER_REVIEW", "COLLEGE_REVIEW", "SCHOOL_FINALIZE"]
        );
    }

    #[test]
    fn test_default_ids_are_negative_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for phase in Phase::ALL {
            for node in default_nodes(phase) {
                assert!(node.id < 0);
                assert!(seen.insert(node.id), "duplicate default id {}", node.id);
            }
        }
    }

    #[test]
    fn test_next_and_previous_node() {
        let nodes = default_nodes(Phase::Application);
        let teacher = find_by_code(&nodes, "TEACHER_REVIEW").unwrap();
        assert_eq!(next_node(&nodes, teacher.id).unwrap().code, "COLLEGE_REVIEW");
        assert_eq!(previous_node(&nodes, teacher.id).unwrap().code, "STUDENT_SUBMIT");

        let last = nodes.last().unwrap();
        assert!(next_node(&nodes, last.id).is_none());
        assert!(previous_node(&nodes, nodes[0].id).is_none());
    }

    #[test]
    fn test_reject_targets_resolve_in_chain_order() {
        let nodes = default_nodes(Phase::Application);
        let college = find_by_code(&nodes, "COLLEGE_REVIEW").unwrap();
        let targets = reject_targets(&nodes, college);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].code, "TEACHER_REVIEW");
    }

    #[test]
    fn test_find_expert_node_by_level_and_scope() {
        let nodes = default_nodes(Phase::Application);
        let school = find_expert_node(&nodes, "LEVEL1", Some(ExpertScope::School)).unwrap();
        assert_eq!(school.code, "SCHOOL_PUBLISH");
        assert!(find_expert_node(&nodes, "TEACHER", None).is_none());
    }

    #[test]
    fn test_validate_accepts_default_chains() {
        for phase in Phase::ALL {
            assert!(validate_nodes(&default_nodes(phase)).is_empty(), "{phase}");
        }
    }

    #[test]
    fn test_validate_empty_chain() {
        let errors = validate_nodes(&[]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("at least one node"));
    }

    #[test]
    fn test_validate_flags_non_submit_first_node() {
        let mut nodes = default_nodes(Phase::Application);
        nodes.remove(0);
        let errors = validate_nodes(&nodes);
        assert!(errors.iter().any(|e| e.contains("first node")));
    }

    #[test]
    fn test_validate_flags_student_role_on_review_node() {
        let mut nodes = default_nodes(Phase::Application);
        nodes[1].role = ROLE_STUDENT.into();
        let errors = validate_nodes(&nodes);
        assert!(errors.iter().any(|e| e.contains("student role")));
    }

    #[test]
    fn test_validate_flags_unknown_and_forward_reject_targets() {
        let mut nodes = default_nodes(Phase::Application);
        nodes[1].allowed_reject_to = vec![9999];
        nodes[2].allowed_reject_to = vec![nodes[3].id];
        let errors = validate_nodes(&nodes);
        assert!(errors.iter().any(|e| e.contains("does not exist")));
        assert!(errors.iter().any(|e| e.contains("earlier nodes")));
    }

    #[test]
    fn test_validate_flags_submit_node_misconfiguration() {
        let mut nodes = default_nodes(Phase::MidTerm);
        nodes[0].require_expert_review = true;
        nodes[0].allowed_reject_to = vec![nodes[1].id];
        let errors = validate_nodes(&nodes);
        assert!(errors.iter().any(|e| e.contains("cannot require expert review")));
        assert!(errors.iter().any(|e| e.contains("must not allow rejection")));
    }

    #[test]
    fn test_effective_review_level_falls_back_to_role() {
        let nodes = default_nodes(Phase::Application);
        assert_eq!(nodes[0].effective_review_level(), "STUDENT");
        assert_eq!(nodes[1].effective_review_level(), "TEACHER");
    }
}
