//! In-app notification fan-out for engine events.
//!
//! Notification delivery is best-effort and runs after the transition
//! transaction commits; a failed insert is logged, never surfaced to the
//! reviewer whose action already succeeded.

use ipms_core::types::DbId;
use ipms_db::models::notification::CreateNotification;
use ipms_db::models::project::Project;
use ipms_db::models::review::Review;
use ipms_db::repositories::NotificationRepo;
use sqlx::PgPool;

/// Tell a project's leader the outcome of a review.
pub async fn review_result(pool: &PgPool, project: &Project, approved: bool, comments: Option<&str>) {
    let outcome = if approved { "approved" } else { "rejected" };
    let mut body = format!("Your project '{}' was {outcome}.", project.title);
    if let Some(comments) = comments.filter(|c| !c.is_empty()) {
        body.push_str(&format!(" Reviewer comments: {comments}"));
    }

    let input = CreateNotification {
        user_id: project.leader_id,
        title: format!("Review {outcome}"),
        body,
    };
    if let Err(err) = NotificationRepo::create(pool, &input).await {
        tracing::warn!(project_id = project.id, error = %err, "Failed to deliver review-result notification");
    }
}

/// Tell an expert they have been assigned a review.
pub async fn review_assigned(pool: &PgPool, expert_id: DbId, project_title: &str, review: &Review) {
    let input = CreateNotification {
        user_id: expert_id,
        title: "Expert review assigned".to_string(),
        body: format!(
            "You have been assigned a {} review for project '{project_title}'.",
            review.review_type
        ),
    };
    if let Err(err) = NotificationRepo::create(pool, &input).await {
        tracing::warn!(review_id = review.id, error = %err, "Failed to deliver assignment notification");
    }
}
