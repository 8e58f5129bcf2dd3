use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify schema.
#[sqlx::test(migrations = "./migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    ipms_db::health_check(&pool).await.unwrap();

    let tables = [
        "users",
        "projects",
        "project_advisors",
        "workflow_definitions",
        "workflow_nodes",
        "phase_instances",
        "reviews",
        "expert_groups",
        "expert_group_members",
        "system_settings",
        "project_archives",
        "notifications",
    ];

    for table in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert!(count.0 >= 0);
    }
}

/// The review window settings ship disabled so a fresh deployment never
/// blocks reviews.
#[sqlx::test(migrations = "./migrations")]
async fn test_window_settings_seeded_disabled(pool: PgPool) {
    for code in ["APPLICATION_WINDOW", "MIDTERM_WINDOW", "CLOSURE_WINDOW"] {
        let value = ipms_db::repositories::SettingRepo::get_value(&pool, code)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("{code} should be seeded"));
        assert_eq!(value["enabled"], serde_json::json!(false), "{code}");
    }
}
