//! Responsible-admin resolution and expert group assignment.

use ipms_core::assignment::{
    check_group_eligibility, scope_value, ExpertCandidate, ProjectScopeFacts, ScopeDimension,
};
use ipms_core::error::CoreError;
use ipms_core::review_level;
use ipms_core::types::DbId;
use ipms_core::workflow::{NodeDef, Phase, ROLE_STUDENT, ROLE_TEACHER};
use ipms_db::models::project::Project;
use ipms_db::models::review::CreateReview;
use ipms_db::models::user::User;
use ipms_db::repositories::{
    ExpertGroupRepo, PhaseInstanceRepo, ProjectRepo, ReviewRepo, SettingRepo, UserRepo,
    WorkflowRepo,
};
use sqlx::PgPool;

use crate::engine::notify;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

/// Setting code mapping role codes to their scope dimension.
const SCOPE_DIMENSIONS_SETTING: &str = "ADMIN_SCOPE_DIMENSIONS";

/// The scope dimension configured for a role, if any.
///
/// Roles without a configured dimension are school-wide: any active
/// holder of the role is responsible for every project.
async fn scope_dimension_for_role(
    pool: &PgPool,
    role: &str,
) -> Result<Option<ScopeDimension>, sqlx::Error> {
    let Some(value) = SettingRepo::get_value(pool, SCOPE_DIMENSIONS_SETTING).await? else {
        return Ok(None);
    };
    Ok(value
        .get(role)
        .and_then(|v| v.as_str())
        .and_then(ScopeDimension::parse))
}

/// Scope facts for one project, gathered from its row and its leader.
async fn project_scope_facts(
    pool: &PgPool,
    project: &Project,
) -> Result<ProjectScopeFacts, sqlx::Error> {
    Ok(ProjectScopeFacts {
        leader_college_code: ProjectRepo::leader_college_code(pool, project.id).await?,
        category_code: project.category_code.clone(),
        level_code: project.level_code.clone(),
        is_key_field: project.is_key_field,
        key_domain_code: project.key_domain_code.clone(),
    })
}

/// The admin responsible for a role on one project.
///
/// Unscoped roles resolve to any active holder; scoped roles resolve to
/// the unique user managing the project's scope value. No match is a
/// hard validation error, never a silent default.
pub async fn resolve_responsible_user(
    pool: &PgPool,
    project: &Project,
    role: &str,
) -> AppResult<User> {
    match scope_dimension_for_role(pool, role).await? {
        None => UserRepo::find_active_by_role(pool, role)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Validation(format!(
                    "no active user holds the {role} role"
                )))
            }),
        Some(dimension) => {
            let facts = project_scope_facts(pool, project).await?;
            let value = scope_value(dimension, &facts)?;
            UserRepo::find_by_role_and_scope(pool, role, &value)
                .await?
                .ok_or_else(|| {
                    AppError::Core(CoreError::Validation(format!(
                        "no admin configured for {role} scope '{value}'"
                    )))
                })
        }
    }
}

/// The reviewer an auto-created primary review should be routed to.
///
/// Advisor nodes route to the project's first advisor; admin nodes route
/// through scope resolution; submission nodes carry no reviewer.
pub async fn resolve_reviewer_for_node(
    pool: &PgPool,
    project: &Project,
    node: &NodeDef,
) -> AppResult<Option<DbId>> {
    resolve_reviewer_for_role(pool, project, &node.role).await
}

/// Role-based variant used by the legacy status tables, where only a
/// review level is known.
pub async fn resolve_reviewer_for_role(
    pool: &PgPool,
    project: &Project,
    role: &str,
) -> AppResult<Option<DbId>> {
    match role {
        ROLE_STUDENT => Ok(None),
        ROLE_TEACHER => {
            let advisors = ProjectRepo::advisor_ids(pool, project.id).await?;
            advisors.first().copied().map(Some).ok_or_else(|| {
                AppError::Core(CoreError::Validation(format!(
                    "project '{}' has no advisor to review it",
                    project.title
                )))
            })
        }
        _ => Ok(Some(resolve_responsible_user(pool, project, role).await?.id)),
    }
}

/// Parameters for a batch expert assignment.
#[derive(Debug)]
pub struct AssignBatchParams {
    pub project_ids: Vec<DbId>,
    pub group_id: DbId,
    pub review_type: String,
    /// Review level the experts act at; defaults to the caller's own.
    pub review_level: Option<String>,
    pub target_node_id: Option<DbId>,
}

/// One project that could not be assigned.
#[derive(Debug)]
pub struct AssignFailure {
    pub project_id: DbId,
    pub reason: String,
}

/// Result of a batch assignment: reviews created plus the projects
/// that were skipped and why.
#[derive(Debug)]
pub struct AssignOutcome {
    pub created: usize,
    pub failures: Vec<AssignFailure>,
}

/// Assign every member of an expert group to a set of projects.
///
/// Group lookup and caller resolution fail the whole batch; everything
/// per-project (advisor conflicts, certification, college membership,
/// node ownership) is validated row by row, so one ineligible project
/// never blocks the rest. Duplicate (review, expert) pairs are skipped
/// silently.
pub async fn assign_group(
    pool: &PgPool,
    creator: &AuthUser,
    params: &AssignBatchParams,
) -> AppResult<AssignOutcome> {
    let phase = Phase::parse(&params.review_type).ok_or_else(|| {
        AppError::BadRequest(format!("unknown review type '{}'", params.review_type))
    })?;

    let group = ExpertGroupRepo::find_by_id(pool, params.group_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "expert group",
            id: params.group_id,
        }))?;
    let members = ExpertGroupRepo::members(pool, group.id).await?;
    let candidates: Vec<ExpertCandidate> = members
        .iter()
        .map(|m| ExpertCandidate {
            user_id: m.user_id,
            name: m.display_name.clone(),
            college_code: m.college_code.clone(),
            is_certified: m.is_expert_certified,
        })
        .collect();

    let creator_user = UserRepo::find_by_id(pool, creator.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "user",
            id: creator.user_id,
        }))?;
    // College admins may only assign experts from their own college.
    let creator_college = match scope_dimension_for_role(pool, &creator_user.role).await? {
        Some(ScopeDimension::College) => creator_user.college_code.as_deref(),
        _ => None,
    };

    let mut outcome = AssignOutcome {
        created: 0,
        failures: Vec::new(),
    };
    for &project_id in &params.project_ids {
        match assign_project(
            pool,
            creator,
            &creator_user,
            creator_college,
            params,
            phase,
            &candidates,
            project_id,
        )
        .await
        {
            Ok(created) => outcome.created += created,
            Err(err) => outcome.failures.push(AssignFailure {
                project_id,
                reason: err.to_string(),
            }),
        }
    }

    tracing::info!(
        group_id = group.id,
        projects = params.project_ids.len(),
        created = outcome.created,
        skipped = outcome.failures.len(),
        "Expert group assigned"
    );
    Ok(outcome)
}

/// Validate and assign one project, returning the reviews created.
#[allow(clippy::too_many_arguments)]
async fn assign_project(
    pool: &PgPool,
    creator: &AuthUser,
    creator_user: &User,
    creator_college: Option<&str>,
    params: &AssignBatchParams,
    phase: Phase,
    candidates: &[ExpertCandidate],
    project_id: DbId,
) -> AppResult<usize> {
    let project = ProjectRepo::find_by_id(pool, project_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "project",
            id: project_id,
        }))?;

    let advisor_ids = ProjectRepo::advisor_ids(pool, project.id).await?;
    check_group_eligibility(candidates, &advisor_ids, creator_college)?;

    let nodes = WorkflowRepo::resolve_nodes(pool, phase, project.batch_id).await?;
    let instance = PhaseInstanceRepo::find_active(pool, project.id, phase.as_str()).await?;

    let target_id = params
        .target_node_id
        .or_else(|| instance.as_ref().and_then(|i| i.current_node_id));
    let node = match target_id {
        Some(target_id) => {
            ipms_core::workflow::find_by_id(&nodes, target_id).ok_or(AppError::Core(
                CoreError::NotFound {
                    entity: "workflow node",
                    id: target_id,
                },
            ))?
        }
        // Legacy attempts carry no node position: fall back to the
        // expert node at the requested review level, defaulting to
        // the creator's own level.
        None => {
            let level = match params.review_level.as_deref() {
                Some(level) => level,
                None => review_level::normalize(&creator_user.role),
            };
            ipms_core::workflow::find_expert_node(&nodes, level, None).ok_or_else(|| {
                AppError::Core(CoreError::Validation(format!(
                    "project '{}' has no active {phase} step to assign experts to",
                    project.title
                )))
            })?
        }
    };
    if !node.require_expert_review {
        return Err(AppError::Core(CoreError::Validation(format!(
            "node '{}' does not accept expert review",
            node.name
        ))));
    }

    // An admin cannot assign experts to a node they don't own.
    let responsible = resolve_responsible_user(pool, &project, &node.role).await?;
    if responsible.id != creator.user_id {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "only the responsible admin may assign experts to node '{}'",
            node.name
        ))));
    }

    let mut created = 0;
    for candidate in candidates {
        let input = CreateReview {
            project_id: project.id,
            phase_instance_id: instance.as_ref().map(|i| i.id),
            workflow_node_id: Some(node.id),
            reviewer_id: Some(candidate.user_id),
            review_type: phase.as_str().to_string(),
            review_level: node.effective_review_level().to_string(),
            is_expert_review: true,
        };
        if let Some(review) = ReviewRepo::create_expert(pool, &input).await? {
            created += 1;
            notify::review_assigned(pool, candidate.user_id, &project.title, &review).await;
        }
    }
    Ok(created)
}
