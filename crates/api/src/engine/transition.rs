//! Approve/reject transition execution.
//!
//! The planners in `ipms_core::transition` decide what a transition
//! changes; this module loads the facts, runs the preconditions, and
//! applies the plan. Every approve or reject spans the review update,
//! the phase-instance update, and the project status update in a single
//! transaction, so a failure midway leaves no visible intermediate
//! state.

use chrono::Utc;
use ipms_core::error::CoreError;
use ipms_core::scoring::{normalize_score_details, ScoreItem};
use ipms_core::transition::{
    self, ensure_experts_resolved, ensure_not_expert_rejection, ensure_pending, plan_approval,
    plan_rejection, NextStep, ReturnTo, ReviewSpec, REVIEW_APPROVED, REVIEW_REJECTED,
};
use ipms_core::types::DbId;
use ipms_core::window::{check_window, window_setting_code, WindowConfig};
use ipms_core::workflow::{self, NodeDef, Phase};
use ipms_db::models::phase_instance::{CreatePhaseInstance, PhaseInstance};
use ipms_db::models::project::Project;
use ipms_db::models::review::{CreateReview, Review, ReviewDecision};
use ipms_db::repositories::{
    ArchiveRepo, PhaseInstanceRepo, ProjectRepo, ReviewRepo, SettingRepo, WorkflowRepo,
};
use sqlx::{PgPool, Postgres, Transaction};

use crate::engine::{assignment, notify};
use crate::error::{AppError, AppResult};

/// Setting code holding review conduct rules.
const REVIEW_RULES_SETTING: &str = "REVIEW_RULES";

/// Comment stamped on pending reviews abandoned by a rejection restart.
const RESTART_COMMENT: &str = "Sent back to restart this step";

/// Fields a reviewer may supply with an approval.
#[derive(Debug, Default)]
pub struct ApproveParams {
    pub comments: Option<String>,
    pub score: Option<i64>,
    pub score_details: Vec<ScoreItem>,
    pub closure_rating: Option<String>,
}

/// Fields a reviewer may supply with a rejection.
#[derive(Debug, Default)]
pub struct RejectParams {
    pub comments: Option<String>,
    /// Deprecated coarse target ("teacher" / "student"); superseded by
    /// `target_node_id`.
    pub reject_to: Option<String>,
    pub target_node_id: Option<DbId>,
}

/// Everything a transition needs about the review being actioned.
struct TransitionContext {
    review: Review,
    project: Project,
    phase: Phase,
    nodes: Vec<NodeDef>,
    instance: Option<PhaseInstance>,
}

/// Approve a review, advancing the project when the review is the
/// node's primary review.
pub async fn approve_review(
    pool: &PgPool,
    review_id: DbId,
    actor_id: DbId,
    params: &ApproveParams,
) -> AppResult<Review> {
    let ctx = load_context(pool, review_id).await?;
    ensure_pending(&ctx.review.status)?;
    check_review_window(pool, ctx.phase).await?;
    check_expert_gate(pool, &ctx).await?;

    let (score, scored_items) = normalize_score_details(params.score, &params.score_details)?;
    let score_details = if scored_items.is_empty() {
        None
    } else {
        Some(serde_json::to_value(&scored_items).map_err(|e| {
            AppError::InternalError(format!("failed to serialize score details: {e}"))
        })?)
    };

    let decision = ReviewDecision {
        reviewer_id: actor_id,
        comments: params.comments.clone(),
        score,
        score_details,
        closure_rating: if ctx.phase == Phase::Closure {
            params.closure_rating.clone()
        } else {
            None
        },
    };

    // Reviewer routing for any auto-created next review is resolved
    // before the transaction opens; it is read-only and may hard-fail.
    let next_review = plan_next_primary(pool, &ctx).await?;

    let mut tx = pool.begin().await?;
    let updated = ReviewRepo::decide_tx(&mut tx, ctx.review.id, REVIEW_APPROVED, &decision).await?;

    // Expert approvals record an opinion only; they never advance the
    // phase.
    if !ctx.review.is_expert_review {
        apply_approval(&mut tx, &ctx, next_review).await?;
    }
    tx.commit().await?;

    if !ctx.review.is_expert_review {
        notify::review_result(pool, &ctx.project, true, params.comments.as_deref()).await;
    }

    tracing::info!(
        review_id = ctx.review.id,
        project_id = ctx.project.id,
        phase = %ctx.phase,
        expert = ctx.review.is_expert_review,
        "Review approved"
    );
    Ok(updated)
}

/// Reject a review, returning the project to an earlier node and
/// starting a new attempt.
pub async fn reject_review(
    pool: &PgPool,
    review_id: DbId,
    actor_id: DbId,
    params: &RejectParams,
) -> AppResult<Review> {
    let ctx = load_context(pool, review_id).await?;
    ensure_not_expert_rejection(ctx.review.is_expert_review)?;
    ensure_pending(&ctx.review.status)?;
    check_review_window(pool, ctx.phase).await?;
    check_reject_rules(pool, params.comments.as_deref()).await?;
    check_expert_gate(pool, &ctx).await?;

    let decision = ReviewDecision {
        reviewer_id: actor_id,
        comments: params.comments.clone(),
        score: None,
        score_details: None,
        closure_rating: None,
    };

    let dynamic_plan = match current_node_id(&ctx) {
        Some(node_id) => plan_rejection(ctx.phase, &ctx.nodes, node_id, params.target_node_id)?,
        None => None,
    };

    // Resolve rejection routing and any recreated review before the
    // transaction opens.
    let reroute = match &dynamic_plan {
        Some(plan) => match &plan.create_review {
            Some(spec) => {
                let target = workflow::find_by_id(&ctx.nodes, spec.node_id).ok_or(
                    AppError::Core(CoreError::NotFound {
                        entity: "workflow node",
                        id: spec.node_id,
                    }),
                )?;
                assignment::resolve_reviewer_for_node(pool, &ctx.project, target).await?
            }
            None => None,
        },
        None => None,
    };

    let mut tx = pool.begin().await?;
    let updated = ReviewRepo::decide_tx(&mut tx, ctx.review.id, REVIEW_REJECTED, &decision).await?;

    match dynamic_plan {
        Some(plan) => {
            let instance = ctx.instance.as_ref().ok_or_else(|| {
                AppError::InternalError("dynamic rejection without a phase instance".into())
            })?;

            ReviewRepo::delete_pending_at_nodes_tx(&mut tx, instance.id, &plan.abandon_node_ids)
                .await?;
            ReviewRepo::reject_pending_at_node_tx(
                &mut tx,
                instance.id,
                plan.target.id,
                RESTART_COMMENT,
            )
            .await?;
            PhaseInstanceRepo::mark_returned_tx(
                &mut tx,
                instance.id,
                plan.return_to.as_str(),
                params.comments.as_deref(),
            )
            .await?;

            let fresh = PhaseInstanceRepo::create_tx(
                &mut tx,
                &CreatePhaseInstance {
                    project_id: ctx.project.id,
                    phase: ctx.phase.as_str().to_string(),
                    attempt_no: instance.attempt_no + 1,
                    current_node_id: Some(plan.target.id),
                    step: plan.target.code.clone(),
                    created_by: Some(actor_id),
                },
            )
            .await?;
            ProjectRepo::set_status_tx(&mut tx, ctx.project.id, plan.project_status).await?;

            if let Some(spec) = &plan.create_review {
                create_primary_tx(&mut tx, &ctx, Some(fresh.id), spec, reroute).await?;
            }
        }
        None => {
            apply_legacy_rejection(&mut tx, pool, &ctx, params).await?;
        }
    }
    tx.commit().await?;

    notify::review_result(pool, &ctx.project, false, params.comments.as_deref()).await;

    tracing::info!(
        review_id = ctx.review.id,
        project_id = ctx.project.id,
        phase = %ctx.phase,
        "Review rejected"
    );
    Ok(updated)
}

/// Candidate return nodes for a review, for the rejection UI.
pub async fn reject_targets(pool: &PgPool, review_id: DbId) -> AppResult<Vec<NodeDef>> {
    let ctx = load_context(pool, review_id).await?;
    let Some(node_id) = current_node_id(&ctx) else {
        return Ok(Vec::new());
    };
    let current = workflow::find_by_id(&ctx.nodes, node_id).ok_or(AppError::Core(
        CoreError::NotFound {
            entity: "workflow node",
            id: node_id,
        },
    ))?;
    Ok(workflow::reject_targets(&ctx.nodes, current)
        .into_iter()
        .cloned()
        .collect())
}

/// Ensure an active phase instance exists for a project's phase,
/// creating one positioned at the chain's submission node if not.
pub async fn ensure_current_instance(
    pool: &PgPool,
    project: &Project,
    phase: Phase,
    actor_id: Option<DbId>,
) -> AppResult<PhaseInstance> {
    if let Some(instance) = PhaseInstanceRepo::find_active(pool, project.id, phase.as_str()).await? {
        return Ok(instance);
    }

    let nodes = WorkflowRepo::resolve_nodes(pool, phase, project.batch_id).await?;
    let initial = workflow::initial_node(&nodes).ok_or_else(|| {
        AppError::InternalError(format!("{phase} workflow resolved to an empty chain"))
    })?;
    let attempt = PhaseInstanceRepo::max_attempt_no(pool, project.id, phase.as_str()).await? + 1;
    let instance = PhaseInstanceRepo::create(
        pool,
        &CreatePhaseInstance {
            project_id: project.id,
            phase: phase.as_str().to_string(),
            attempt_no: attempt,
            current_node_id: Some(initial.id),
            step: initial.code.clone(),
            created_by: actor_id,
        },
    )
    .await?;
    Ok(instance)
}

/// Submit a phase: ensure an attempt exists at the submission node,
/// advance it to the first review node, and create that node's primary
/// review.
pub async fn submit_phase(
    pool: &PgPool,
    project_id: DbId,
    phase: Phase,
    actor_id: DbId,
) -> AppResult<PhaseInstance> {
    let project = ProjectRepo::find_by_id(pool, project_id).await?.ok_or(
        AppError::Core(CoreError::NotFound {
            entity: "project",
            id: project_id,
        }),
    )?;
    check_review_window(pool, phase).await?;

    let nodes = WorkflowRepo::resolve_nodes(pool, phase, project.batch_id).await?;
    let instance = ensure_current_instance(pool, &project, phase, Some(actor_id)).await?;

    let node_id = instance.current_node_id.ok_or_else(|| {
        AppError::Core(CoreError::Conflict(
            "this phase attempt predates workflow tracking and cannot be resubmitted".into(),
        ))
    })?;
    let current = workflow::find_by_id(&nodes, node_id).ok_or(AppError::Core(
        CoreError::NotFound {
            entity: "workflow node",
            id: node_id,
        },
    ))?;
    if current.node_type != workflow::NodeType::Submit {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "the {phase} phase is already under review at '{}'",
            current.name
        ))));
    }

    let plan = plan_approval(phase, &nodes, node_id)?;
    let NextStep::Advance {
        node,
        project_status,
        create_review,
    } = plan.next
    else {
        return Err(AppError::Core(CoreError::Validation(
            "the workflow has no review step after submission".into(),
        )));
    };
    let reviewer = assignment::resolve_reviewer_for_node(pool, &project, &node).await?;

    let mut tx = pool.begin().await?;
    let updated = PhaseInstanceRepo::set_position_tx(&mut tx, instance.id, node.id, &node.code).await?;
    ProjectRepo::set_status_tx(&mut tx, project.id, project_status).await?;
    if let Some(spec) = create_review {
        ReviewRepo::create_primary_tx(
            &mut tx,
            &CreateReview {
                project_id: project.id,
                phase_instance_id: Some(instance.id),
                workflow_node_id: Some(spec.node_id),
                reviewer_id: reviewer,
                review_type: phase.as_str().to_string(),
                review_level: spec.review_level.clone(),
                is_expert_review: false,
            },
        )
        .await?;
    }
    tx.commit().await?;

    tracing::info!(project_id = project.id, phase = %phase, attempt = updated.attempt_no, "Phase submitted");
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Context loading and preconditions
// ---------------------------------------------------------------------------

async fn load_context(pool: &PgPool, review_id: DbId) -> AppResult<TransitionContext> {
    let review = ReviewRepo::find_by_id(pool, review_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "review",
            id: review_id,
        }))?;
    let phase = Phase::parse(&review.review_type).ok_or_else(|| {
        AppError::InternalError(format!("review {review_id} has unknown type '{}'", review.review_type))
    })?;
    let project = ProjectRepo::find_by_id(pool, review.project_id).await?.ok_or(
        AppError::Core(CoreError::NotFound {
            entity: "project",
            id: review.project_id,
        }),
    )?;
    let nodes = WorkflowRepo::resolve_nodes(pool, phase, project.batch_id).await?;
    let instance = match review.phase_instance_id {
        Some(id) => PhaseInstanceRepo::find_by_id(pool, id).await?,
        None => None,
    };

    Ok(TransitionContext {
        review,
        project,
        phase,
        nodes,
        instance,
    })
}

/// The node the project currently sits at, preferring the review's own
/// node over the instance position (defensive sync when they diverge).
fn current_node_id(ctx: &TransitionContext) -> Option<DbId> {
    ctx.review
        .workflow_node_id
        .or_else(|| ctx.instance.as_ref().and_then(|i| i.current_node_id))
        .filter(|id| workflow::find_by_id(&ctx.nodes, *id).is_some())
}

/// Gate the primary review on its node's expert sub-reviews.
async fn check_expert_gate(pool: &PgPool, ctx: &TransitionContext) -> AppResult<()> {
    if ctx.review.is_expert_review {
        return Ok(());
    }
    let statuses = ReviewRepo::expert_statuses(
        pool,
        ctx.project.id,
        ctx.review.phase_instance_id,
        ctx.review.workflow_node_id,
    )
    .await?;
    // Legacy rows have no node to read the flag from; treat any expert
    // assignment at the position as required.
    let required = match current_node_id(ctx).and_then(|id| workflow::find_by_id(&ctx.nodes, id)) {
        Some(node) => node.require_expert_review,
        None => !statuses.is_empty(),
    };
    ensure_experts_resolved(required, &statuses)?;
    Ok(())
}

/// Deny review actions outside the phase's configured window.
async fn check_review_window(pool: &PgPool, phase: Phase) -> AppResult<()> {
    let Some(value) = SettingRepo::get_value(pool, window_setting_code(phase)).await? else {
        return Ok(());
    };
    let config: WindowConfig = serde_json::from_value(value).map_err(|_| {
        AppError::Core(CoreError::Validation(
            "review window setting is misconfigured, contact an administrator".into(),
        ))
    })?;
    check_window(&config, Utc::now().date_naive())?;
    Ok(())
}

/// Enforce the configured minimum rejection comment.
async fn check_reject_rules(pool: &PgPool, comments: Option<&str>) -> AppResult<()> {
    let Some(rules) = SettingRepo::get_value(pool, REVIEW_RULES_SETTING).await? else {
        return Ok(());
    };
    let required = rules
        .get("reject_requires_comment")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !required {
        return Ok(());
    }
    let min_len = rules
        .get("min_comment_length")
        .and_then(|v| v.as_u64())
        .unwrap_or(1) as usize;
    let len = comments.map(|c| c.trim().chars().count()).unwrap_or(0);
    if len < min_len {
        return Err(AppError::Core(CoreError::Validation(format!(
            "a rejection comment of at least {min_len} characters is required"
        ))));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Approval application
// ---------------------------------------------------------------------------

/// The next primary review an approval will create, with its routed
/// reviewer, or `None` when the approval completes the phase or falls to
/// the legacy path.
async fn plan_next_primary(
    pool: &PgPool,
    ctx: &TransitionContext,
) -> AppResult<Option<(ReviewSpec, Option<DbId>)>> {
    if ctx.review.is_expert_review {
        return Ok(None);
    }
    match current_node_id(ctx) {
        Some(node_id) => {
            let plan = plan_approval(ctx.phase, &ctx.nodes, node_id)?;
            match plan.next {
                NextStep::Advance {
                    node,
                    create_review: Some(spec),
                    ..
                } => {
                    let reviewer =
                        assignment::resolve_reviewer_for_node(pool, &ctx.project, &node).await?;
                    Ok(Some((spec, reviewer)))
                }
                _ => Ok(None),
            }
        }
        None => {
            // Legacy path: routing is by review level alone.
            let Some(plan) = transition::legacy::approval(ctx.phase, &ctx.review.review_level)
            else {
                return Ok(None);
            };
            match plan.next_review_level {
                Some(level) => {
                    let role = legacy_level_role(level);
                    let reviewer =
                        assignment::resolve_reviewer_for_role(pool, &ctx.project, role).await?;
                    Ok(Some((
                        ReviewSpec {
                            node_id: 0,
                            node_code: String::new(),
                            review_level: level.to_string(),
                        },
                        reviewer,
                    )))
                }
                None => Ok(None),
            }
        }
    }
}

async fn apply_approval(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &TransitionContext,
    next_review: Option<(ReviewSpec, Option<DbId>)>,
) -> AppResult<()> {
    match current_node_id(ctx) {
        Some(node_id) => {
            let instance = ctx.instance.as_ref().ok_or_else(|| {
                AppError::InternalError("dynamic approval without a phase instance".into())
            })?;
            // Defensive sync: trust the review's node when the instance
            // position diverged.
            if instance.current_node_id != Some(node_id) {
                let node = workflow::find_by_id(&ctx.nodes, node_id).ok_or(AppError::Core(
                    CoreError::NotFound {
                        entity: "workflow node",
                        id: node_id,
                    },
                ))?;
                PhaseInstanceRepo::set_position_tx(tx, instance.id, node.id, &node.code).await?;
            }

            let plan = plan_approval(ctx.phase, &ctx.nodes, node_id)?;
            match plan.next {
                NextStep::Advance {
                    node,
                    project_status,
                    create_review,
                } => {
                    PhaseInstanceRepo::set_position_tx(tx, instance.id, node.id, &node.code)
                        .await?;
                    ProjectRepo::set_status_tx(tx, ctx.project.id, project_status).await?;
                    if create_review.is_some() {
                        let (spec, reviewer) = next_review.ok_or_else(|| {
                            AppError::InternalError("next review was not pre-resolved".into())
                        })?;
                        create_primary_tx(tx, ctx, Some(instance.id), &spec, reviewer).await?;
                    }
                }
                NextStep::Complete {
                    project_status,
                    archive,
                } => {
                    PhaseInstanceRepo::mark_completed_tx(tx, instance.id).await?;
                    ProjectRepo::set_status_tx(tx, ctx.project.id, project_status).await?;
                    if archive {
                        let snapshot = serde_json::to_value(&ctx.project).map_err(|e| {
                            AppError::InternalError(format!("failed to snapshot project: {e}"))
                        })?;
                        ArchiveRepo::ensure_snapshot_tx(tx, ctx.project.id, &snapshot).await?;
                    }
                }
            }
        }
        None => {
            let plan = transition::legacy::approval(ctx.phase, &ctx.review.review_level)
                .ok_or_else(|| {
                    AppError::Core(CoreError::Validation(format!(
                        "cannot determine the next step for review level '{}'",
                        ctx.review.review_level
                    )))
                })?;
            ProjectRepo::set_status_tx(tx, ctx.project.id, plan.project_status).await?;
            if plan.next_review_level.is_some() {
                let (spec, reviewer) = next_review.ok_or_else(|| {
                    AppError::InternalError("next review was not pre-resolved".into())
                })?;
                create_legacy_primary_tx(tx, ctx, &spec.review_level, reviewer).await?;
            }
            if plan.completes_phase {
                if let Some(instance) = &ctx.instance {
                    PhaseInstanceRepo::mark_completed_tx(tx, instance.id).await?;
                }
                if plan.archive {
                    let snapshot = serde_json::to_value(&ctx.project).map_err(|e| {
                        AppError::InternalError(format!("failed to snapshot project: {e}"))
                    })?;
                    ArchiveRepo::ensure_snapshot_tx(tx, ctx.project.id, &snapshot).await?;
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rejection application (legacy)
// ---------------------------------------------------------------------------

async fn apply_legacy_rejection(
    tx: &mut Transaction<'_, Postgres>,
    pool: &PgPool,
    ctx: &TransitionContext,
    params: &RejectParams,
) -> AppResult<()> {
    let reject_to = match params.reject_to.as_deref() {
        Some("teacher") => Some(ReturnTo::Teacher),
        Some("student") => Some(ReturnTo::Student),
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "unknown reject_to value '{other}'"
            )))
        }
        None => None,
    };

    let plan = transition::legacy::rejection(ctx.phase, &ctx.review.review_level, reject_to)
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "cannot determine the rejection effect for review level '{}'",
                ctx.review.review_level
            )))
        })?;

    ProjectRepo::set_status_tx(tx, ctx.project.id, plan.project_status).await?;
    if let (Some(instance), Some(return_to)) = (&ctx.instance, plan.return_to) {
        PhaseInstanceRepo::mark_returned_tx(
            tx,
            instance.id,
            return_to.as_str(),
            params.comments.as_deref(),
        )
        .await?;
    }
    if let Some(level) = plan.recreate_review_level {
        let role = legacy_level_role(level);
        let reviewer = assignment::resolve_reviewer_for_role(pool, &ctx.project, role).await?;
        create_legacy_primary_tx(tx, ctx, level, reviewer).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Review creation helpers
// ---------------------------------------------------------------------------

async fn create_primary_tx(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &TransitionContext,
    phase_instance_id: Option<DbId>,
    spec: &ReviewSpec,
    reviewer_id: Option<DbId>,
) -> AppResult<()> {
    ReviewRepo::create_primary_tx(
        tx,
        &CreateReview {
            project_id: ctx.project.id,
            phase_instance_id,
            workflow_node_id: Some(spec.node_id),
            reviewer_id,
            review_type: ctx.phase.as_str().to_string(),
            review_level: spec.review_level.clone(),
            is_expert_review: false,
        },
    )
    .await?;
    Ok(())
}

async fn create_legacy_primary_tx(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &TransitionContext,
    review_level: &str,
    reviewer_id: Option<DbId>,
) -> AppResult<()> {
    ReviewRepo::create_primary_tx(
        tx,
        &CreateReview {
            project_id: ctx.project.id,
            phase_instance_id: ctx.review.phase_instance_id,
            workflow_node_id: None,
            reviewer_id,
            review_type: ctx.phase.as_str().to_string(),
            review_level: review_level.to_string(),
            is_expert_review: false,
        },
    )
    .await?;
    Ok(())
}

/// The role a legacy review level routes to.
fn legacy_level_role(level: &str) -> &'static str {
    match level {
        "TEACHER" => ipms_core::workflow::ROLE_TEACHER,
        "LEVEL2" => ipms_core::workflow::ROLE_LEVEL2_ADMIN,
        _ => ipms_core::workflow::ROLE_LEVEL1_ADMIN,
    }
}
