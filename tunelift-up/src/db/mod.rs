//! Database access for tunelift-up
//!
//! SQLite-backed durable draft storage.

pub mod drafts;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

pub use drafts::{DraftRepository, SqliteDraftRepository};

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Initialize tunelift-up specific tables
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS release_drafts (
            session_key TEXT PRIMARY KEY,
            draft_id TEXT NOT NULL,
            artist_id TEXT NOT NULL,
            status TEXT NOT NULL,
            step TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (release_drafts)");

    Ok(())
}
