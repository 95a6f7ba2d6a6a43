//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for leaders, contacts and the procedure ledger.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Periodically drop operation ledger entries older than `retention`.
pub fn spawn_ledger_sweeper(
    repo: Arc<Repository>,
    retention: Duration,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = repo.prune_operations(retention).await {
                tracing::warn!("Operation ledger sweep failed: {}", e);
            }
        }
    })
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leaders (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT,
            status TEXT NOT NULL
                CHECK (status IN ('ACTIVE', 'PENDING', 'INACTIVE', 'INVITED')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // owner_id has no ON DELETE action: a leader row cannot go while it still owns contacts.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS people (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            owner_id TEXT NOT NULL REFERENCES leaders(id),
            tags TEXT NOT NULL DEFAULT '[]',
            project_ids TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rpc_operations (
            operation_id TEXT PRIMARY KEY,
            procedure TEXT NOT NULL,
            response TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_leaders_status ON leaders(status);
        CREATE INDEX IF NOT EXISTS idx_people_owner_id ON people(owner_id);
        CREATE INDEX IF NOT EXISTS idx_rpc_operations_created_at ON rpc_operations(created_at);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
