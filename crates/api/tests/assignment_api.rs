//! HTTP-level integration tests for expert group assignment and the
//! expert gate on primary reviews.

mod common;

use axum::http::StatusCode;
use common::{
    add_advisor, body_json, build_test_app, get, post_json, seed_expert, seed_expert_group,
    seed_project, seed_scoped_admin, seed_user, seed_user_in_college, token_for,
};
use sqlx::PgPool;

struct Fixture {
    teacher: i64,
    college_admin: i64,
    experts: Vec<i64>,
    group: i64,
    project: i64,
}

/// Seed a project sitting at the college review node with an expert
/// group owned by the responsible college admin.
async fn seed_fixture(pool: &PgPool) -> Fixture {
    let student = seed_user_in_college(pool, "student", "STUDENT", Some("CS")).await;
    let teacher = seed_user(pool, "advisor", "TEACHER").await;
    let college_admin = seed_scoped_admin(pool, "cs_admin", "LEVEL2_ADMIN", "CS").await;
    // Approving the college node routes the next review to a school
    // admin; resolution hard-fails if none exists.
    seed_user(pool, "school_admin", "LEVEL1_ADMIN").await;
    let project = seed_project(pool, "Bridge sensor mesh", student).await;
    add_advisor(pool, project, teacher).await;

    let experts = vec![
        seed_expert(pool, "expert_one", "CS").await,
        seed_expert(pool, "expert_two", "CS").await,
    ];
    let group = seed_expert_group(pool, "CS panel", college_admin, &experts).await;

    // Walk the project to the college node: submit, then advisor approves.
    post_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project}/phases/APPLICATION/submit"),
        &token_for(student, "STUDENT"),
        serde_json::json!({}),
    )
    .await;
    let review = primary_review_id(pool, project).await;
    post_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/reviews/{review}/review"),
        &token_for(teacher, "TEACHER"),
        serde_json::json!({"action": "approve"}),
    )
    .await;

    Fixture {
        teacher,
        college_admin,
        experts,
        group,
        project,
    }
}

async fn primary_review_id(pool: &PgPool, project_id: i64) -> i64 {
    let row: (i64,) = sqlx::query_as(
        "SELECT id FROM reviews
         WHERE project_id = $1 AND status = 'PENDING' AND is_expert_review = FALSE",
    )
    .bind(project_id)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

async fn assign(pool: &PgPool, fixture: &Fixture) -> axum::response::Response {
    post_json(
        build_test_app(pool.clone()),
        "/api/v1/reviews/assignments/assign_batch",
        &token_for(fixture.college_admin, "LEVEL2_ADMIN"),
        serde_json::json!({
            "project_ids": [fixture.project],
            "group_id": fixture.group,
            "review_type": "APPLICATION",
        }),
    )
    .await
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_assign_batch_creates_one_review_per_expert(pool: PgPool) {
    let fixture = seed_fixture(&pool).await;

    let response = assign(&pool, &fixture).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["count"], 2);

    // Each expert sees their own pending review.
    for &expert in &fixture.experts {
        let response = get(
            build_test_app(pool.clone()),
            "/api/v1/reviews/pending",
            &token_for(expert, "TEACHER"),
        )
        .await;
        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_reassignment_skips_existing_pairs(pool: PgPool) {
    let fixture = seed_fixture(&pool).await;

    assign(&pool, &fixture).await;
    let response = assign(&pool, &fixture).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["count"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_advisor_cannot_be_assigned_as_expert(pool: PgPool) {
    let fixture = seed_fixture(&pool).await;

    // Slip the project's own advisor into the group.
    sqlx::query("INSERT INTO expert_group_members (group_id, user_id) VALUES ($1, $2)")
        .bind(fixture.group)
        .bind(fixture.teacher)
        .execute(&pool)
        .await
        .unwrap();

    let response = assign(&pool, &fixture).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["count"], 0);
    let failed = json["data"]["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["id"], fixture.project);
    assert!(failed[0]["reason"].as_str().unwrap().contains("advisor"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_outside_college_expert_is_refused(pool: PgPool) {
    let fixture = seed_fixture(&pool).await;
    let outsider = seed_expert(&pool, "ee_expert", "EE").await;
    sqlx::query("INSERT INTO expert_group_members (group_id, user_id) VALUES ($1, $2)")
        .bind(fixture.group)
        .bind(outsider)
        .execute(&pool)
        .await
        .unwrap();

    let response = assign(&pool, &fixture).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["count"], 0);
    assert_eq!(json["data"]["failed"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_non_responsible_admin_cannot_assign(pool: PgPool) {
    let fixture = seed_fixture(&pool).await;
    // An admin of a different college, with a group of matching experts.
    let other_admin = seed_scoped_admin(&pool, "ee_admin", "LEVEL2_ADMIN", "EE").await;

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/reviews/assignments/assign_batch",
        &token_for(other_admin, "LEVEL2_ADMIN"),
        serde_json::json!({
            "project_ids": [fixture.project],
            "group_id": fixture.group,
            "review_type": "APPLICATION",
        }),
    )
    .await;
    // Group members are from CS while the creator manages EE.
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["count"], 0);
    assert_eq!(json["data"]["failed"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_failing_project_does_not_block_the_rest(pool: PgPool) {
    let fixture = seed_fixture(&pool).await;

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/reviews/assignments/assign_batch",
        &token_for(fixture.college_admin, "LEVEL2_ADMIN"),
        serde_json::json!({
            // A project id that does not exist, then the real one.
            "project_ids": [999_999, fixture.project],
            "group_id": fixture.group,
            "review_type": "APPLICATION",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    // The bad row is reported; the good one still gets both experts.
    assert_eq!(json["data"]["count"], 2);
    let failed = json["data"]["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["id"], 999_999);

    let pending: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM reviews
         WHERE project_id = $1 AND is_expert_review = TRUE AND status = 'PENDING'",
    )
    .bind(fixture.project)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(pending.0, 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_pending_experts_block_primary_approval(pool: PgPool) {
    let fixture = seed_fixture(&pool).await;
    assign(&pool, &fixture).await;

    let primary = primary_review_id(&pool, fixture.project).await;
    let response = post_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/reviews/{primary}/review"),
        &token_for(fixture.college_admin, "LEVEL2_ADMIN"),
        serde_json::json!({"action": "approve"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["message"].as_str().unwrap().contains("expert"));

    // Experts file their opinions; one approves, one rejects. Expert
    // rejection records an opinion but cannot return the project.
    for (idx, &expert) in fixture.experts.iter().enumerate() {
        let review: (i64,) = sqlx::query_as(
            "SELECT id FROM reviews
             WHERE project_id = $1 AND reviewer_id = $2 AND is_expert_review = TRUE",
        )
        .bind(fixture.project)
        .bind(expert)
        .fetch_one(&pool)
        .await
        .unwrap();
        let action = if idx == 0 { "approve" } else { "reject" };
        let response = post_json(
            build_test_app(pool.clone()),
            &format!("/api/v1/reviews/{}/review", review.0),
            &token_for(expert, "TEACHER"),
            serde_json::json!({"action": action, "comments": "expert opinion", "score": 80}),
        )
        .await;
        if action == "reject" {
            // Expert rejection is refused outright.
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            // File it as an approval instead so the gate can clear.
            let response = post_json(
                build_test_app(pool.clone()),
                &format!("/api/v1/reviews/{}/review", review.0),
                &token_for(expert, "TEACHER"),
                serde_json::json!({"action": "approve", "comments": "reservations noted", "score": 55}),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
        } else {
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    // With every expert resolved the primary approval goes through.
    let response = post_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/reviews/{primary}/review"),
        &token_for(fixture.college_admin, "LEVEL2_ADMIN"),
        serde_json::json!({"action": "approve"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}
