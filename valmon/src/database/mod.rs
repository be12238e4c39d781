//! Database module for valmon.
//!
//! This module provides the embedded persistence layer using SQLite with sqlx.
//! It includes connection pool management, the namespaced key/value store the
//! alert cache and cycle summaries live in, and periodic maintenance.

pub mod maintenance;
pub mod store;
pub mod time;

pub use maintenance::{MaintenanceConfig, StoreMaintenance};
pub use store::{KvStore, Namespace, SqlxKvStore};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Database connection pool type alias.
pub type DbPool = Pool<Sqlite>;

/// Database file name inside the configured data directory.
pub const DATABASE_FILE: &str = "valmon.db";

/// Default connection pool size.
const DEFAULT_POOL_SIZE: u32 = 4;

/// Default busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 30_000;

/// Default WAL auto-checkpoint threshold in pages.
/// With a typical 4KB page size, 1000 pages is ~4MB.
const DEFAULT_WAL_AUTOCHECKPOINT_PAGES: i32 = 1000;

/// Limit WAL size growth (bytes).
const DEFAULT_JOURNAL_SIZE_LIMIT_BYTES: i64 = 16 * 1024 * 1024; // 16MB

async fn apply_per_connection_pragmas(
    conn: &mut sqlx::SqliteConnection,
) -> Result<(), sqlx::Error> {
    // Ensure WAL auto-checkpoint is enabled to avoid unbounded WAL growth.
    sqlx::query(&format!(
        "PRAGMA wal_autocheckpoint = {}",
        DEFAULT_WAL_AUTOCHECKPOINT_PAGES
    ))
    .execute(&mut *conn)
    .await?;

    sqlx::query(&format!(
        "PRAGMA journal_size_limit = {}",
        DEFAULT_JOURNAL_SIZE_LIMIT_BYTES
    ))
    .execute(&mut *conn)
    .await?;

    sqlx::query("PRAGMA temp_store = MEMORY")
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn ensure_wal_mode(pool: &DbPool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let row = sqlx::query("PRAGMA journal_mode")
        .fetch_one(&mut *conn)
        .await?;
    let mode: String = row.get(0);
    if mode != "wal" && mode != "memory" {
        tracing::warn!("journal_mode was '{}', expected 'wal'; re-setting", mode);
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Build the SQLite URL for the database file inside `data_dir`.
pub fn database_url(data_dir: &Path) -> String {
    format!(
        "sqlite:{}?mode=rwc",
        data_dir.join(DATABASE_FILE).to_string_lossy()
    )
}

/// Initialize the database connection pool with WAL mode.
///
/// # Arguments
/// * `database_url` - SQLite database URL (e.g., "sqlite:valmon.db?mode=rwc")
/// * `max_connections` - Maximum number of connections in the pool
pub async fn init_pool_with_size(
    database_url: &str,
    max_connections: u32,
) -> Result<DbPool, sqlx::Error> {
    let connect_options = SqliteConnectOptions::from_str(database_url)?
        // Enable WAL mode for concurrent reads during writes
        .journal_mode(SqliteJournalMode::Wal)
        // Alert entries must survive a crash right after a notification went out.
        .synchronous(SqliteSynchronous::Full)
        .busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .after_connect(|conn, _meta| {
            Box::pin(async move { apply_per_connection_pragmas(&mut *conn).await })
        })
        .connect_with(connect_options)
        .await?;

    ensure_wal_mode(&pool).await?;

    tracing::info!(
        "Database pool initialized with WAL mode, {} max connections",
        max_connections
    );

    Ok(pool)
}

/// Initialize the database connection pool with default size.
pub async fn init_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    init_pool_with_size(database_url, DEFAULT_POOL_SIZE).await
}

/// Create the data directory if needed, open the pool and apply migrations.
pub async fn open(data_dir: &Path) -> crate::Result<DbPool> {
    tokio::fs::create_dir_all(data_dir).await?;
    let pool = init_pool(&database_url(data_dir)).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> crate::Result<()> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations completed");
    Ok(())
}
