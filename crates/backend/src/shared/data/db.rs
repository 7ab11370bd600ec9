use once_cell::sync::OnceCell;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement,
};
use std::path::Path;

use super::schema;

static DB_CONN: OnceCell<DatabaseConnection> = OnceCell::new();

pub fn build_sqlite_url(path: &Path) -> String {
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    format!("sqlite://{}{}?mode=rwc", prefix, normalized)
}

/// Open a connection pool. In-memory databases are pinned to a single
/// connection, otherwise every pooled connection would see its own empty DB.
pub async fn connect(url: &str) -> anyhow::Result<DatabaseConnection> {
    let in_memory = url.contains(":memory:");
    let mut options = ConnectOptions::new(url.to_string());
    options.sqlx_logging(false);
    if in_memory {
        options.max_connections(1).min_connections(1);
    }

    let conn = Database::connect(options).await?;
    if !in_memory {
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "PRAGMA journal_mode = WAL;".to_string(),
        ))
        .await?;
    }
    Ok(conn)
}

/// Connect to `db_file`, bring its schema up to date and publish the
/// connection for [`get_connection`].
pub async fn initialize_database(db_file: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if db_file.is_absolute() {
        db_file.to_path_buf()
    } else {
        std::env::current_dir()?.join(db_file)
    };
    tracing::info!("Opening database at {}", absolute_path.display());

    let conn = connect(&build_sqlite_url(&absolute_path)).await?;
    schema::bootstrap_schema(&conn).await?;

    DB_CONN
        .set(conn)
        .map_err(|_| anyhow::anyhow!("Failed to set DB_CONN"))?;
    Ok(())
}

pub fn get_connection() -> &'static DatabaseConnection {
    DB_CONN
        .get()
        .expect("Database connection has not been initialized")
}

/// Fresh in-memory database with the full schema, for tests
pub async fn connect_in_memory() -> anyhow::Result<DatabaseConnection> {
    let conn = connect("sqlite::memory:").await?;
    schema::bootstrap_schema(&conn).await?;
    Ok(conn)
}
