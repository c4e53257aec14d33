//! Database access for navres
//!
//! SQLite holds the routing outcome log and user feedback. Routing
//! statistics are aggregated from the log on startup, never stored.

pub mod outcomes;

pub use outcomes::SqliteOutcomeStore;

use navres_common::Result;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info};

/// Database file name inside the data folder
pub const DATABASE_FILE: &str = "navres.db";

/// Open (creating if needed) the database and its tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the outcome and feedback tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS routing_outcomes (
            id TEXT PRIMARY KEY,
            query TEXT NOT NULL,
            pattern TEXT NOT NULL,
            provider TEXT NOT NULL,
            success INTEGER NOT NULL,
            latitude REAL,
            longitude REAL,
            formatted_address TEXT,
            provider_confidence REAL,
            observed_at TEXT,
            recorded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_routing_outcomes_pattern ON routing_outcomes (pattern, provider)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS routing_feedback (
            id TEXT PRIMARY KEY,
            query TEXT NOT NULL,
            pattern TEXT NOT NULL,
            provider TEXT NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            formatted_address TEXT NOT NULL,
            provider_confidence REAL NOT NULL,
            is_correct INTEGER NOT NULL,
            recorded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database tables initialized (routing_outcomes, routing_feedback)");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_database_file() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join(DATABASE_FILE);

        let pool = init_database_pool(&db_path).await.unwrap();
        assert!(db_path.exists());

        // Idempotent
        init_tables(&pool).await.unwrap();
    }
}
