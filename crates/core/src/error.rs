use crate::types::DbId;

/// Domain error shared by the workflow planners and everything above
/// them. The API layer maps each variant onto an HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A project, review, workflow node, or other row that should
    /// exist does not.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// Bad input: malformed score details, an ineligible expert group,
    /// a reject target outside the allowed set.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The action is valid but the current state refuses it, e.g.
    /// deciding a review that is no longer pending.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller's identity could not be established.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is known but may not act here, e.g. assigning
    /// experts to a node another admin owns.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A broken invariant on our side, never the caller's fault.
    #[error("internal error: {0}")]
    Internal(String),
}
