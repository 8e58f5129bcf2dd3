//! Pure transition planning for the workflow engine.
//!
//! Given a resolved node chain and a project's current position, the
//! planners here compute everything a transition must write: the next
//! node, the project status, which review rows to create or abandon, and
//! where a rejection sends the project. The engine applies a plan inside
//! one database transaction; nothing in this module touches storage.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status;
use crate::types::DbId;
use crate::workflow::{self, NodeDef, NodeType, Phase};

// Review row statuses.
pub const REVIEW_PENDING: &str = "PENDING";
pub const REVIEW_APPROVED: &str = "APPROVED";
pub const REVIEW_REJECTED: &str = "REJECTED";

/// Who a returned phase attempt goes back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnTo {
    Student,
    Teacher,
}

impl ReturnTo {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnTo::Student => "STUDENT",
            ReturnTo::Teacher => "TEACHER",
        }
    }
}

/// A primary review row the engine must create at a node.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSpec {
    pub node_id: DbId,
    pub node_code: String,
    pub review_level: String,
}

impl ReviewSpec {
    fn for_node(node: &NodeDef) -> ReviewSpec {
        ReviewSpec {
            node_id: node.id,
            node_code: node.code.clone(),
            review_level: node.effective_review_level().to_string(),
        }
    }
}

/// Where an approval moves the project.
#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    /// Move to the given node; create its primary review if present.
    Advance {
        node: NodeDef,
        project_status: &'static str,
        create_review: Option<ReviewSpec>,
    },
    /// The chain is exhausted; the phase attempt completes.
    Complete {
        project_status: &'static str,
        /// CLOSURE completion snapshots the project into the archive.
        archive: bool,
    },
}

/// The full effect of approving a node's primary review.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalPlan {
    pub next: NextStep,
}

/// The full effect of rejecting a node's primary review.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectionPlan {
    pub target: NodeDef,
    pub project_status: &'static str,
    pub return_to: ReturnTo,
    /// Review to auto-create on the fresh attempt. `None` when the target
    /// is the submission node (the student must resubmit manually).
    pub create_review: Option<ReviewSpec>,
    /// Nodes strictly after the target whose pending reviews are deleted.
    pub abandon_node_ids: Vec<DbId>,
}

// ---------------------------------------------------------------------------
// Preconditions
// ---------------------------------------------------------------------------

/// Reject a second action on an already-processed review.
pub fn ensure_pending(review_status: &str) -> Result<(), CoreError> {
    if review_status == REVIEW_PENDING {
        Ok(())
    } else {
        Err(CoreError::Conflict(
            "review has already been processed".to_string(),
        ))
    }
}

/// Gate a primary review action on its node's expert sub-reviews.
///
/// `expert_statuses` are the statuses of every expert review attached to
/// the same node within the same phase attempt.
pub fn ensure_experts_resolved(
    require_expert_review: bool,
    expert_statuses: &[String],
) -> Result<(), CoreError> {
    if !require_expert_review {
        return Ok(());
    }
    let pending = expert_statuses
        .iter()
        .filter(|s| s.as_str() == REVIEW_PENDING)
        .count();
    if pending > 0 {
        return Err(CoreError::Validation(format!(
            "expert review not yet fully submitted ({pending} pending)"
        )));
    }
    Ok(())
}

/// Expert reviews record an opinion; they can never return a project.
pub fn ensure_not_expert_rejection(is_expert_review: bool) -> Result<(), CoreError> {
    if is_expert_review {
        Err(CoreError::Validation(
            "expert review cannot reject a project".to_string(),
        ))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Planners
// ---------------------------------------------------------------------------

/// Plan the effect of a non-expert approval at `current_node_id`.
pub fn plan_approval(
    phase: Phase,
    nodes: &[NodeDef],
    current_node_id: DbId,
) -> Result<ApprovalPlan, CoreError> {
    if workflow::find_by_id(nodes, current_node_id).is_none() {
        return Err(CoreError::NotFound {
            entity: "workflow node",
            id: current_node_id,
        });
    }

    let next = match workflow::next_node(nodes, current_node_id) {
        Some(node) => NextStep::Advance {
            project_status: status::status_for_node(phase, node),
            create_review: node
                .node_type
                .carries_review()
                .then(|| ReviewSpec::for_node(node)),
            node: node.clone(),
        },
        None => NextStep::Complete {
            project_status: status::terminal_status(phase),
            archive: phase == Phase::Closure,
        },
    };

    Ok(ApprovalPlan { next })
}

/// Plan the effect of a non-expert rejection at `current_node_id`.
///
/// An explicit `target_node_id` takes priority; otherwise the node's
/// first configured reject target is used. `Ok(None)` means the chain has
/// no target and the caller must fall back to the legacy status tables.
pub fn plan_rejection(
    phase: Phase,
    nodes: &[NodeDef],
    current_node_id: DbId,
    target_node_id: Option<DbId>,
) -> Result<Option<RejectionPlan>, CoreError> {
    let current = workflow::find_by_id(nodes, current_node_id).ok_or(CoreError::NotFound {
        entity: "workflow node",
        id: current_node_id,
    })?;

    let target = match target_node_id {
        Some(id) => {
            let target = workflow::find_by_id(nodes, id).ok_or(CoreError::NotFound {
                entity: "workflow node",
                id,
            })?;
            let targets = workflow::reject_targets(nodes, current);
            if !targets.iter().any(|n| n.id == id) {
                return Err(CoreError::Validation(format!(
                    "node '{}' is not a permitted return target for '{}'",
                    target.name, current.name
                )));
            }
            target
        }
        None => match workflow::reject_targets(nodes, current).first() {
            Some(target) => *target,
            None => return Ok(None),
        },
    };

    let is_submit = target.node_type == NodeType::Submit;
    let target_idx = nodes
        .iter()
        .position(|n| n.id == target.id)
        .unwrap_or_default();
    let abandon_node_ids = nodes
        .iter()
        .skip(target_idx + 1)
        .map(|n| n.id)
        .collect();

    Ok(Some(RejectionPlan {
        project_status: if is_submit {
            status::returned_status(phase)
        } else {
            status::status_for_node(phase, target)
        },
        return_to: if is_submit {
            ReturnTo::Student
        } else {
            ReturnTo::Teacher
        },
        create_review: (!is_submit).then(|| ReviewSpec::for_node(target)),
        abandon_node_ids,
        target: target.clone(),
    }))
}

// ---------------------------------------------------------------------------
// Legacy fallback tables
// ---------------------------------------------------------------------------

/// Fixed phase/level status tables for review rows predating the node
/// graph (no phase instance or current node). Deprecated; kept so
/// unmigrated data still resolves.
pub mod legacy {
    use super::ReturnTo;
    use crate::review_level;
    use crate::status;
    use crate::workflow::Phase;

    /// Effect of a legacy approval.
    #[derive(Debug, Clone, PartialEq)]
    pub struct LegacyApproval {
        pub project_status: &'static str,
        /// Review level whose primary review the caller creates next.
        pub next_review_level: Option<&'static str>,
        pub completes_phase: bool,
        pub archive: bool,
    }

    /// Effect of a legacy rejection.
    #[derive(Debug, Clone, PartialEq)]
    pub struct LegacyRejection {
        pub project_status: &'static str,
        pub return_to: Option<ReturnTo>,
        /// Review level to recreate a pending review for (closure
        /// level-1 sending the project back to the advisor).
        pub recreate_review_level: Option<&'static str>,
    }

    /// Look up the legacy approval effect for a (phase, review level).
    pub fn approval(phase: Phase, raw_level: &str) -> Option<LegacyApproval> {
        let level = review_level::normalize(raw_level);
        let plan = match (phase, level) {
            (Phase::Application, review_level::TEACHER) => LegacyApproval {
                project_status: status::COLLEGE_AUDITING,
                next_review_level: Some(review_level::LEVEL2),
                completes_phase: false,
                archive: false,
            },
            (Phase::Application, review_level::LEVEL2) => LegacyApproval {
                project_status: status::LEVEL1_AUDITING,
                next_review_level: Some(review_level::LEVEL1),
                completes_phase: false,
                archive: false,
            },
            (Phase::Application, review_level::LEVEL1) => LegacyApproval {
                project_status: status::IN_PROGRESS,
                next_review_level: None,
                completes_phase: true,
                archive: false,
            },
            (Phase::MidTerm, review_level::TEACHER) => LegacyApproval {
                project_status: status::MID_TERM_REVIEWING,
                next_review_level: Some(review_level::LEVEL2),
                completes_phase: false,
                archive: false,
            },
            (Phase::MidTerm, review_level::LEVEL2) => LegacyApproval {
                project_status: status::READY_FOR_CLOSURE,
                next_review_level: None,
                completes_phase: true,
                archive: false,
            },
            (Phase::Closure, review_level::TEACHER) => LegacyApproval {
                project_status: status::CLOSURE_LEVEL2_REVIEWING,
                next_review_level: Some(review_level::LEVEL2),
                completes_phase: false,
                archive: false,
            },
            (Phase::Closure, review_level::LEVEL2) => LegacyApproval {
                project_status: status::CLOSURE_LEVEL1_REVIEWING,
                next_review_level: Some(review_level::LEVEL1),
                completes_phase: false,
                archive: false,
            },
            (Phase::Closure, review_level::LEVEL1) => LegacyApproval {
                project_status: status::CLOSED,
                next_review_level: None,
                completes_phase: true,
                archive: true,
            },
            _ => return None,
        };
        Some(plan)
    }

    /// Look up the legacy rejection effect for a (phase, review level).
    ///
    /// `reject_to` is the deprecated request field steering where a
    /// closure level-1 rejection returns the project.
    pub fn rejection(
        phase: Phase,
        raw_level: &str,
        reject_to: Option<ReturnTo>,
    ) -> Option<LegacyRejection> {
        let level = review_level::normalize(raw_level);
        let plan = match (phase, level) {
            (Phase::Application, review_level::TEACHER) => LegacyRejection {
                project_status: status::TEACHER_REJECTED,
                return_to: Some(ReturnTo::Student),
                recreate_review_level: None,
            },
            (Phase::Application, review_level::LEVEL2 | review_level::LEVEL1) => LegacyRejection {
                project_status: status::APPLICATION_RETURNED,
                return_to: Some(ReturnTo::Student),
                recreate_review_level: None,
            },
            (Phase::MidTerm, review_level::TEACHER | review_level::LEVEL2) => LegacyRejection {
                project_status: status::MID_TERM_REJECTED,
                return_to: Some(ReturnTo::Student),
                recreate_review_level: None,
            },
            (Phase::Closure, review_level::TEACHER) => LegacyRejection {
                project_status: status::CLOSURE_DRAFT,
                return_to: Some(ReturnTo::Student),
                recreate_review_level: None,
            },
            (Phase::Closure, review_level::LEVEL2) => LegacyRejection {
                project_status: status::CLOSURE_LEVEL2_REJECTED,
                return_to: Some(ReturnTo::Student),
                recreate_review_level: None,
            },
            (Phase::Closure, review_level::LEVEL1) => match reject_to {
                Some(ReturnTo::Teacher) => LegacyRejection {
                    project_status: status::CLOSURE_SUBMITTED,
                    return_to: Some(ReturnTo::Teacher),
                    recreate_review_level: Some(review_level::TEACHER),
                },
                Some(ReturnTo::Student) => LegacyRejection {
                    project_status: status::CLOSURE_DRAFT,
                    return_to: Some(ReturnTo::Student),
                    recreate_review_level: None,
                },
                None => LegacyRejection {
                    project_status: status::CLOSURE_LEVEL1_REJECTED,
                    return_to: None,
                    recreate_review_level: None,
                },
            },
            _ => return None,
        };
        Some(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::workflow::{default_nodes, find_by_code};

    #[test]
    fn test_approval_advances_and_creates_next_review() {
        let nodes = default_nodes(Phase::Application);
        let teacher = find_by_code(&nodes, "TEACHER_REVIEW").unwrap();
        let plan = plan_approval(Phase::Application, &nodes, teacher.id).unwrap();
        assert_matches!(plan.next, NextStep::Advance { node, project_status, create_review } => {
            assert_eq!(node.code, "COLLEGE_REVIEW");
            assert_eq!(project_status, status::COLLEGE_AUDITING);
            let spec = create_review.unwrap();
            assert_eq!(spec.review_level, "LEVEL2");
        });
    }

    #[test]
    fn test_approval_at_terminal_node_completes_phase() {
        let nodes = default_nodes(Phase::Application);
        let last = nodes.last().unwrap();
        let plan = plan_approval(Phase::Application, &nodes, last.id).unwrap();
        assert_matches!(plan.next, NextStep::Complete { project_status, archive } => {
            assert_eq!(project_status, status::IN_PROGRESS);
            assert!(!archive);
        });
    }

    #[test]
    fn test_closure_completion_requests_archive() {
        let nodes = default_nodes(Phase::Closure);
        let last = nodes.last().unwrap();
        let plan = plan_approval(Phase::Closure, &nodes, last.id).unwrap();
        assert_matches!(plan.next, NextStep::Complete { archive: true, .. });
    }

    #[test]
    fn test_approval_at_unknown_node_is_not_found() {
        let nodes = default_nodes(Phase::Application);
        assert_matches!(
            plan_approval(Phase::Application, &nodes, 424242),
            Err(CoreError::NotFound { .. })
        );
    }

    #[test]
    fn test_rejection_to_default_target() {
        let nodes = default_nodes(Phase::Application);
        let college = find_by_code(&nodes, "COLLEGE_REVIEW").unwrap();
        let plan = plan_rejection(Phase::Application, &nodes, college.id, None)
            .unwrap()
            .unwrap();
        assert_eq!(plan.target.code, "TEACHER_REVIEW");
        assert_eq!(plan.return_to, ReturnTo::Teacher);
        assert_eq!(plan.project_status, status::TEACHER_AUDITING);
        assert!(plan.create_review.is_some());
        // Everything after the advisor node is abandoned.
        assert_eq!(plan.abandon_node_ids.len(), 2);
    }

    #[test]
    fn test_rejection_to_submit_node_returns_to_student() {
        let nodes = default_nodes(Phase::Application);
        let teacher = find_by_code(&nodes, "TEACHER_REVIEW").unwrap();
        let submit = &nodes[0];
        let plan = plan_rejection(Phase::Application, &nodes, teacher.id, Some(submit.id))
            .unwrap()
            .unwrap();
        assert_eq!(plan.return_to, ReturnTo::Student);
        assert_eq!(plan.project_status, status::APPLICATION_RETURNED);
        assert!(plan.create_review.is_none());
    }

    #[test]
    fn test_rejection_rejects_unpermitted_explicit_target() {
        let nodes = default_nodes(Phase::Application);
        let college = find_by_code(&nodes, "COLLEGE_REVIEW").unwrap();
        let submit = &nodes[0];
        // College's only configured target is the advisor node.
        assert_matches!(
            plan_rejection(Phase::Application, &nodes, college.id, Some(submit.id)),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn test_rejection_without_targets_defers_to_legacy() {
        let mut nodes = default_nodes(Phase::Application);
        let teacher_idx = 1;
        nodes[teacher_idx].allowed_reject_to.clear();
        let teacher_id = nodes[teacher_idx].id;
        let plan = plan_rejection(Phase::Application, &nodes, teacher_id, None).unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn test_ensure_pending_conflicts_on_processed_review() {
        assert!(ensure_pending(REVIEW_PENDING).is_ok());
        assert_matches!(ensure_pending(REVIEW_APPROVED), Err(CoreError::Conflict(_)));
        assert_matches!(ensure_pending(REVIEW_REJECTED), Err(CoreError::Conflict(_)));
    }

    #[test]
    fn test_experts_must_all_be_resolved() {
        let statuses = vec![REVIEW_APPROVED.to_string(), REVIEW_PENDING.to_string()];
        let err = ensure_experts_resolved(true, &statuses).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) => {
            assert!(msg.contains("not yet fully submitted"));
        });

        let resolved = vec![REVIEW_APPROVED.to_string(), REVIEW_REJECTED.to_string()];
        assert!(ensure_experts_resolved(true, &resolved).is_ok());
        assert!(ensure_experts_resolved(false, &statuses).is_ok());
    }

    #[test]
    fn test_expert_review_cannot_reject() {
        assert_matches!(
            ensure_not_expert_rejection(true),
            Err(CoreError::Validation(_))
        );
        assert!(ensure_not_expert_rejection(false).is_ok());
    }

    #[test]
    fn test_legacy_approval_tables() {
        let plan = legacy::approval(Phase::Application, "TEACHER").unwrap();
        assert_eq!(plan.project_status, status::COLLEGE_AUDITING);
        assert_eq!(plan.next_review_level, Some("LEVEL2"));

        let done = legacy::approval(Phase::Closure, "LEVEL1_ADMIN").unwrap();
        assert!(done.completes_phase);
        assert!(done.archive);
        assert_eq!(done.project_status, status::CLOSED);

        assert!(legacy::approval(Phase::MidTerm, "MYSTERY_ROLE").is_none());
    }

    #[test]
    fn test_legacy_closure_level1_rejection_routing() {
        let to_teacher =
            legacy::rejection(Phase::Closure, "LEVEL1", Some(ReturnTo::Teacher)).unwrap();
        assert_eq!(to_teacher.project_status, status::CLOSURE_SUBMITTED);
        assert_eq!(to_teacher.recreate_review_level, Some("TEACHER"));

        let to_student =
            legacy::rejection(Phase::Closure, "LEVEL1", Some(ReturnTo::Student)).unwrap();
        assert_eq!(to_student.project_status, status::CLOSURE_DRAFT);

        let plain = legacy::rejection(Phase::Closure, "LEVEL1", None).unwrap();
        assert_eq!(plain.project_status, status::CLOSURE_LEVEL1_REJECTED);
        assert!(plain.return_to.is_none());
    }
}
