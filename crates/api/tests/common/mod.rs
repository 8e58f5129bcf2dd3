//! Shared helpers for HTTP-level integration tests.
//!
//! Each test builds the real application router against its own
//! migrated database (via `#[sqlx::test]`) and talks to it with
//! `tower::ServiceExt::oneshot`, so the full middleware stack runs.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use ipms_api::auth::jwt::{generate_access_token, JwtConfig};
use ipms_api::config::ServerConfig;
use ipms_api::router::build_app_router;
use ipms_api::state::AppState;

/// Signing secret shared by the test config and [`token_for`].
const TEST_JWT_SECRET: &str = "integration-test-secret-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        db_max_connections: 5,
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// Build the full application router, middleware included, on `pool`.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// Mint a bearer token accepted by the test app.
pub fn token_for(user_id: i64, role: &str) -> String {
    let config = JwtConfig {
        secret: TEST_JWT_SECRET.to_string(),
        access_token_expiry_mins: 60,
    };
    generate_access_token(user_id, role, &config).expect("token generation failed")
}

pub async fn get(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request build failed");
    app.oneshot(request).await.expect("request failed")
}

pub async fn post_json(app: Router, uri: &str, token: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request build failed");
    app.oneshot(request).await.expect("request failed")
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body read failed")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

// ---------------------------------------------------------------------------
// Seed helpers
// ---------------------------------------------------------------------------

pub async fn seed_user(pool: &PgPool, username: &str, role: &str) -> i64 {
    seed_user_in_college(pool, username, role, None).await
}

pub async fn seed_user_in_college(
    pool: &PgPool,
    username: &str,
    role: &str,
    college: Option<&str>,
) -> i64 {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO users (username, display_name, role, college_code)
         VALUES ($1, $1, $2, $3) RETURNING id",
    )
    .bind(username)
    .bind(role)
    .bind(college)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

pub async fn seed_scoped_admin(
    pool: &PgPool,
    username: &str,
    role: &str,
    college: &str,
) -> i64 {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO users (username, display_name, role, college_code, managed_scope_value)
         VALUES ($1, $1, $2, $3, $3) RETURNING id",
    )
    .bind(username)
    .bind(role)
    .bind(college)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

pub async fn seed_expert(pool: &PgPool, username: &str, college: &str) -> i64 {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO users (username, display_name, role, college_code, is_expert_certified)
         VALUES ($1, $1, 'TEACHER', $2, TRUE) RETURNING id",
    )
    .bind(username)
    .bind(college)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

pub async fn seed_project(pool: &PgPool, title: &str, leader_id: i64) -> i64 {
    let row: (i64,) =
        sqlx::query_as("INSERT INTO projects (title, leader_id) VALUES ($1, $2) RETURNING id")
            .bind(title)
            .bind(leader_id)
            .fetch_one(pool)
            .await
            .unwrap();
    row.0
}

pub async fn add_advisor(pool: &PgPool, project_id: i64, user_id: i64) {
    sqlx::query("INSERT INTO project_advisors (project_id, user_id) VALUES ($1, $2)")
        .bind(project_id)
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_expert_group(pool: &PgPool, name: &str, creator: i64, members: &[i64]) -> i64 {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO expert_groups (name, created_by) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(creator)
    .fetch_one(pool)
    .await
    .unwrap();
    for &member in members {
        sqlx::query("INSERT INTO expert_group_members (group_id, user_id) VALUES ($1, $2)")
            .bind(row.0)
            .bind(member)
            .execute(pool)
            .await
            .unwrap();
    }
    row.0
}

pub async fn project_status(pool: &PgPool, project_id: i64) -> String {
    let row: (String,) = sqlx::query_as("SELECT status FROM projects WHERE id = $1")
        .bind(project_id)
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}
