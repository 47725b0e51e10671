use sqlx::SqlitePool;
use std::collections::HashSet;
use thiserror::Error;

/// Migration error types
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Failed(#[from] sqlx::migrate::MigrateError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Version number of the migration
    pub version: i64,
    /// Description of the migration
    pub description: String,
    /// Whether the migration has been applied
    pub applied: bool,
    /// Checksum of the migration file
    pub checksum: Vec<u8>,
}

/// Migration manager for the embedded schema migrations
pub struct MigrationManager {
    pool: SqlitePool,
}

impl MigrationManager {
    /// Create a new migration manager
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations in version order.
    ///
    /// The first migration uses `IF NOT EXISTS`, so a database created by
    /// earlier tooling with the same tables is adopted rather than rejected.
    pub async fn run_migrations(&self) -> Result<(), MigrationError> {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations completed");
        Ok(())
    }

    /// Status of every embedded migration
    pub async fn check_status(&self) -> Result<Vec<MigrationStatus>, MigrationError> {
        let migrator = sqlx::migrate!("./migrations");

        let applied: HashSet<i64> = if self.tracking_table_exists().await? {
            sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = 1")
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .collect()
        } else {
            HashSet::new()
        };

        Ok(migrator
            .iter()
            .map(|migration| MigrationStatus {
                version: migration.version,
                description: migration.description.to_string(),
                applied: applied.contains(&migration.version),
                checksum: migration.checksum.to_vec(),
            })
            .collect())
    }

    /// Check if there are pending migrations
    pub async fn has_pending_migrations(&self) -> Result<bool, MigrationError> {
        let status = self.check_status().await?;
        Ok(status.iter().any(|s| !s.applied))
    }

    /// Get the current schema version (highest applied migration)
    pub async fn current_version(&self) -> Result<Option<i64>, MigrationError> {
        if !self.tracking_table_exists().await? {
            return Ok(None);
        }

        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1")
                .fetch_one(&self.pool)
                .await?;

        Ok(version)
    }

    async fn tracking_table_exists(&self) -> Result<bool, MigrationError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }
}
