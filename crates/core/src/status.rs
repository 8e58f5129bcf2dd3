//! Project status vocabulary and node-to-status mapping.
//!
//! Project rows carry a flat status string; the workflow engine derives it
//! from the phase and the node that currently holds the project. The
//! constants here are the full closed vocabulary.

use crate::review_level;
use crate::workflow::{NodeDef, Phase};

// Application phase.
pub const TEACHER_AUDITING: &str = "TEACHER_AUDITING";
pub const COLLEGE_AUDITING: &str = "COLLEGE_AUDITING";
pub const LEVEL1_AUDITING: &str = "LEVEL1_AUDITING";
pub const APPLICATION_RETURNED: &str = "APPLICATION_RETURNED";
pub const TEACHER_REJECTED: &str = "TEACHER_REJECTED";
pub const IN_PROGRESS: &str = "IN_PROGRESS";

// Mid-term phase.
pub const MID_TERM_SUBMITTED: &str = "MID_TERM_SUBMITTED";
pub const MID_TERM_REVIEWING: &str = "MID_TERM_REVIEWING";
pub const MID_TERM_RETURNED: &str = "MID_TERM_RETURNED";
pub const MID_TERM_REJECTED: &str = "MID_TERM_REJECTED";
pub const READY_FOR_CLOSURE: &str = "READY_FOR_CLOSURE";

// Closure phase.
pub const CLOSURE_DRAFT: &str = "CLOSURE_DRAFT";
pub const CLOSURE_SUBMITTED: &str = "CLOSURE_SUBMITTED";
pub const CLOSURE_LEVEL2_REVIEWING: &str = "CLOSURE_LEVEL2_REVIEWING";
pub const CLOSURE_LEVEL1_REVIEWING: &str = "CLOSURE_LEVEL1_REVIEWING";
pub const CLOSURE_LEVEL2_REJECTED: &str = "CLOSURE_LEVEL2_REJECTED";
pub const CLOSURE_LEVEL1_REJECTED: &str = "CLOSURE_LEVEL1_REJECTED";
pub const CLOSED: &str = "CLOSED";

/// The project status while a given node holds the project.
///
/// Mapping goes by the node's normalized review level so renamed or
/// custom-configured nodes still land on a known status. Unknown levels
/// fall back to the phase's generic reviewing status.
pub fn status_for_node(phase: Phase, node: &NodeDef) -> &'static str {
    let level = review_level::normalize(node.effective_review_level());
    match phase {
        Phase::Application => match level {
            review_level::TEACHER => TEACHER_AUDITING,
            review_level::LEVEL2 => COLLEGE_AUDITING,
            review_level::LEVEL1 => LEVEL1_AUDITING,
            _ => COLLEGE_AUDITING,
        },
        Phase::MidTerm => match level {
            review_level::TEACHER => MID_TERM_SUBMITTED,
            _ => MID_TERM_REVIEWING,
        },
        Phase::Closure => match level {
            review_level::TEACHER => CLOSURE_SUBMITTED,
            review_level::LEVEL2 => CLOSURE_LEVEL2_REVIEWING,
            review_level::LEVEL1 => CLOSURE_LEVEL1_REVIEWING,
            _ => CLOSURE_LEVEL2_REVIEWING,
        },
    }
}

/// The status reached when the last node of a phase approves.
pub fn terminal_status(phase: Phase) -> &'static str {
    match phase {
        Phase::Application => IN_PROGRESS,
        Phase::MidTerm => READY_FOR_CLOSURE,
        Phase::Closure => CLOSED,
    }
}

/// The status set when a phase attempt is returned to the student.
pub fn returned_status(phase: Phase) -> &'static str {
    match phase {
        Phase::Application => APPLICATION_RETURNED,
        Phase::MidTerm => MID_TERM_RETURNED,
        Phase::Closure => CLOSURE_DRAFT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{default_nodes, find_by_code};

    #[test]
    fn test_application_statuses_follow_the_chain() {
        let nodes = default_nodes(Phase::Application);
        let teacher = find_by_code(&nodes, "TEACHER_REVIEW").unwrap();
        let college = find_by_code(&nodes, "COLLEGE_REVIEW").unwrap();
        let school = find_by_code(&nodes, "SCHOOL_PUBLISH").unwrap();
        assert_eq!(status_for_node(Phase::Application, teacher), TEACHER_AUDITING);
        assert_eq!(status_for_node(Phase::Application, college), COLLEGE_AUDITING);
        assert_eq!(status_for_node(Phase::Application, school), LEVEL1_AUDITING);
    }

    #[test]
    fn test_mid_term_unknown_level_falls_back_to_reviewing() {
        let nodes = default_nodes(Phase::MidTerm);
        let mut custom = nodes[2].clone();
        custom.review_level = "SPECIAL_PANEL".into();
        assert_eq!(status_for_node(Phase::MidTerm, &custom), MID_TERM_REVIEWING);
    }

    #[test]
    fn test_closure_statuses_follow_the_chain() {
        let nodes = default_nodes(Phase::Closure);
        let teacher = find_by_code(&nodes, "TEACHER_REVIEW").unwrap();
        let college = find_by_code(&nodes, "COLLEGE_REVIEW").unwrap();
        let school = find_by_code(&nodes, "SCHOOL_FINALIZE").unwrap();
        assert_eq!(status_for_node(Phase::Closure, teacher), CLOSURE_SUBMITTED);
        assert_eq!(status_for_node(Phase::Closure, college), CLOSURE_LEVEL2_REVIEWING);
        assert_eq!(status_for_node(Phase::Closure, school), CLOSURE_LEVEL1_REVIEWING);
    }

    #[test]
    fn test_terminal_statuses() {
        assert_eq!(terminal_status(Phase::Application), IN_PROGRESS);
        assert_eq!(terminal_status(Phase::MidTerm), READY_FOR_CLOSURE);
        assert_eq!(terminal_status(Phase::Closure), CLOSED);
    }

    #[test]
    fn test_returned_statuses() {
        assert_eq!(returned_status(Phase::Application), APPLICATION_RETURNED);
        assert_eq!(returned_status(Phase::MidTerm), MID_TERM_RETURNED);
        assert_eq!(returned_status(Phase::Closure), CLOSURE_DRAFT);
    }
}
