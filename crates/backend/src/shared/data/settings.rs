//! Key/value settings stored in `sys_settings`.

use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

pub async fn get<C: ConnectionTrait>(conn: &C, key: &str) -> anyhow::Result<Option<String>> {
    let row = conn
        .query_one(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "SELECT value FROM sys_settings WHERE key = ?",
            [key.into()],
        ))
        .await?;
    match row {
        Some(row) => Ok(Some(row.try_get("", "value")?)),
        None => Ok(None),
    }
}

pub async fn set<C: ConnectionTrait>(conn: &C, key: &str, value: &str) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        r#"
        INSERT INTO sys_settings (key, value, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        [key.into(), value.into(), now.clone().into(), now.into()],
    ))
    .await?;
    Ok(())
}
