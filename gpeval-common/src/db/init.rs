//! Database initialization
//!
//! Opens (creating if needed) the shared SQLite database and brings the schema up
//! to date. Every statement is idempotent, so all services may call
//! [`init_database`] at startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas are per connection, so they go on the connect options rather than
    // through a one-off query against the pool.
    // WAL lets readers proceed while one writer commits; the busy timeout makes
    // concurrent writers queue instead of failing with SQLITE_BUSY.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_presenters_table(pool).await?;
    create_monthly_stats_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the presenters table
///
/// `canonical_name` is stored next to the display name so the unique index can
/// stop two concurrent resolutions from creating the same presenter twice within a
/// scope. NULL scope columns are folded to -1 in the index because SQLite treats
/// NULLs as distinct.
pub async fn create_presenters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS presenters (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            display_name TEXT NOT NULL,
            canonical_name TEXT NOT NULL,
            team_id INTEGER,
            owner_id INTEGER,
            created_at TEXT NOT NULL,
            CHECK (length(canonical_name) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_presenters_identity
        ON presenters(canonical_name, COALESCE(team_id, -1), COALESCE(owner_id, -1))
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_presenters_team ON presenters(team_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_presenters_owner ON presenters(owner_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the monthly_stats table
///
/// One row per (presenter, month, year). `team_id`/`owner_id` are copied from the
/// presenter when the row is created; period listings and clears filter on these
/// copies. Deleting a presenter removes its ledger rows.
pub async fn create_monthly_stats_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS monthly_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            presenter_id INTEGER NOT NULL REFERENCES presenters(id) ON DELETE CASCADE,
            month INTEGER NOT NULL,
            year INTEGER NOT NULL,
            attitude INTEGER NOT NULL DEFAULT 0,
            mistakes INTEGER NOT NULL DEFAULT 0,
            total_games INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            team_id INTEGER,
            owner_id INTEGER,
            updated_by INTEGER,
            updated_at TEXT NOT NULL,
            UNIQUE (presenter_id, month, year),
            CHECK (month BETWEEN 1 AND 12),
            CHECK (mistakes >= 0),
            CHECK (total_games >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_monthly_stats_period ON monthly_stats(year, month)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
