//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use strata_config::DatabaseConfig;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
/// Filename SQLite treats as a private in-memory database.
const IN_MEMORY: &str = ":memory:";

/// Database connection pool for the record store.
///
/// This is the main entry point for interacting with the database. It manages
/// the SQLite connection pool; sessions (pooled connections and transactions)
/// are acquired from it per storage operation.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // This is IMPORTANT to apply the query-based PRAGMAs to EVERY
            // connection (set by max connections) instead of only the
            // first connection returned by the pool.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max.max(1))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Connect to the database described by the configuration.
    ///
    /// A path of `:memory:` opens an in-memory database.
    pub async fn connect_with(config: &DatabaseConfig) -> Result<Self> {
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        if config.path == Path::new(IN_MEMORY) {
            return Self::new(Self::base_options(busy_timeout).filename(IN_MEMORY), 1).await;
        }
        let options = Self::base_options(busy_timeout).filename(&config.path).create_if_missing(true);
        Self::new(options, config.max_connections).await
    }

    /// Connect to the database at the given path with default settings.
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let config = DatabaseConfig { path: path.as_ref().to_path_buf(), ..Default::default() };
        Self::connect_with(&config).await
    }

    /// Connect to an in-memory database (useful for testing).
    ///
    /// Note:
    /// - In-memory databases are destroyed when the connection closes.
    /// - Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        // In-memory database must either use the same cache `.shared_cache(true)`,
        // or be limited to one connection. Otherwise parallel connections will
        // see different databases that contain different data.
        Self::connect(IN_MEMORY).await
    }

    /// Base connection options shared between file and in-memory databases.
    fn base_options(busy_timeout: Duration) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // Enable WAL mode for better concurrent read performance
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            // PRAGMA synchronous = NORMAL (balance between safety and speed)
            .synchronous(SqliteSynchronous::Normal)
            // Writers to the same path serialize on the database lock; this is
            // how long one waits for another before failing with SQLITE_BUSY.
            .busy_timeout(busy_timeout)
            .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::None)
    }

    /// Apply additional PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        // Prefix filters compare lower-cased keys with LIKE; keep it
        // case-insensitive on every connection regardless of build defaults.
        sqlx::query("PRAGMA case_sensitive_like = OFF; PRAGMA temp_store = MEMORY;")
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    ///
    /// This is called automatically by the connect functions, but can be
    /// called manually if needed.
    #[instrument("performing database migrations")]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    ///
    /// This waits for all connections to be returned to the pool and then
    /// closes them. After calling this, the Database instance should not
    /// be used.
    pub async fn close(&self) {
        // Let SQLite update query planner statistics
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_has_one_connection() {
        let db = Database::connect_in_memory().await.unwrap();
        assert_eq!(db.pool().options().get_max_connections(), 1);
        db.close().await;
        assert!(db.pool().is_closed());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_file_database_uses_configured_settings() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("nested.sqlite"),
            max_connections: 3,
            busy_timeout_ms: 1234,
        };
        let db = Database::connect_with(&config).await.unwrap();
        assert!(config.path.is_file());
        assert_eq!(db.pool().options().get_max_connections(), 3);
        let (timeout,): (i64,) = sqlx::query_as("PRAGMA busy_timeout").fetch_one(db.pool()).await.unwrap();
        assert_eq!(timeout, 1234);
        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode").fetch_one(db.pool()).await.unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        db.close().await;
    }

    #[tokio::test]
    async fn test_like_is_case_insensitive() {
        let db = Database::connect_in_memory().await.unwrap();
        let (matched,): (bool,) = sqlx::query_as("SELECT 'ABC/Def' LIKE 'abc/%'").fetch_one(db.pool()).await.unwrap();
        assert!(matched);
        db.close().await;
    }

    #[tokio::test]
    async fn test_schema_is_created() {
        let db = Database::connect_in_memory().await.unwrap();
        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE 'file%' ORDER BY name")
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(tables, ["file", "file_meta"]);
        db.close().await;
    }
}
