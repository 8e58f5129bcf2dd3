//! Repository for the `system_settings` table.

use sqlx::PgPool;

use crate::models::setting::SystemSetting;

/// Column list for system_settings queries.
const COLUMNS: &str = "id, code, value, created_at, updated_at";

/// Provides keyed access to JSON system settings.
pub struct SettingRepo;

impl SettingRepo {
    /// The JSON value stored under a setting code, if any.
    pub async fn get_value(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<serde_json::Value>, sqlx::Error> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT value FROM system_settings WHERE code = $1")
                .bind(code)
                .fetch_optional(pool)
                .await?;
        Ok(row.map(|(value,)| value))
    }

    /// Insert or replace the value under a setting code.
    pub async fn upsert(
        pool: &PgPool,
        code: &str,
        value: &serde_json::Value,
    ) -> Result<SystemSetting, sqlx::Error> {
        let query = format!(
            "INSERT INTO system_settings (code, value)
             VALUES ($1, $2)
             ON CONFLICT (code) DO UPDATE SET value = $2, updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SystemSetting>(&query)
            .bind(code)
            .bind(value)
            .fetch_one(pool)
            .await
    }
}
