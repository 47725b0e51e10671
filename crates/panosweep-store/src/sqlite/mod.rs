//! SQLite storage adapter implementation

pub mod config;
pub mod migrations;
pub mod panoramas;
pub mod samples;
pub mod transaction;

pub use config::{ConfigError, MigrationConfig, PoolConfig, SqliteConfig};
pub use migrations::{MigrationError, MigrationManager, MigrationStatus};
pub use transaction::{Transaction, TransactionManager};

use panosweep_core::error::{PanosweepError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

/// SQLite storage adapter
pub struct SqliteStore {
    pool: SqlitePool,
    config: SqliteConfig,
    transactions: TransactionManager,
    /// Serializes bulk appends so concurrent seeders queue here instead of
    /// spinning on SQLite's busy timeout
    append_lock: Mutex<()>,
}

impl SqliteStore {
    /// Open (or create) the database file and, if configured, apply migrations
    pub async fn new(config: SqliteConfig) -> Result<Self> {
        config.validate().map_err(|e| PanosweepError::ConfigInvalid {
            key: "database_path".to_string(),
            reason: e.to_string(),
        })?;

        // WAL lets readers proceed while a worker holds the write lock
        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .min_connections(config.pool.min_connections)
            .max_connections(config.pool.max_connections)
            .acquire_timeout(config.pool.acquire_timeout)
            .idle_timeout(config.pool.idle_timeout)
            .max_lifetime(config.pool.max_lifetime)
            .connect_with(options)
            .await
            .map_err(|e| PanosweepError::Storage(format!("Failed to open database: {}", e)))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| PanosweepError::Storage(format!("Connection test failed: {}", e)))?;

        tracing::info!(path = %config.database_path.display(), "Opened sample database");

        let transactions = TransactionManager::new(pool.clone(), config.transaction_timeout);
        let store = Self { pool, config, transactions, append_lock: Mutex::new(()) };
        if store.config.migrations.auto_run {
            store.run_migrations().await?;
        }
        Ok(store)
    }

    /// Open the store and run migrations regardless of `MigrationConfig::auto_run`
    pub async fn with_migrations(mut config: SqliteConfig) -> Result<Self> {
        config.migrations.auto_run = true;
        Self::new(config).await
    }

    /// Run all pending migrations
    pub async fn run_migrations(&self) -> Result<()> {
        let manager = MigrationManager::new(self.pool.clone());
        manager
            .run_migrations()
            .await
            .map_err(|e| PanosweepError::Storage(format!("Migration failed: {}", e)))
    }

    /// Check migration status
    pub async fn migration_status(&self) -> Result<Vec<MigrationStatus>> {
        let manager = MigrationManager::new(self.pool.clone());
        manager.check_status().await.map_err(|e| {
            PanosweepError::Storage(format!("Failed to check migration status: {}", e))
        })
    }

    /// Check if there are pending migrations
    pub async fn has_pending_migrations(&self) -> Result<bool> {
        let manager = MigrationManager::new(self.pool.clone());
        manager.has_pending_migrations().await.map_err(|e| {
            PanosweepError::Storage(format!("Failed to check pending migrations: {}", e))
        })
    }

    /// Get the current schema version
    pub async fn current_version(&self) -> Result<Option<i64>> {
        let manager = MigrationManager::new(self.pool.clone());
        manager
            .current_version()
            .await
            .map_err(|e| PanosweepError::Storage(format!("Failed to get current version: {}", e)))
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    pub(crate) fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    pub(crate) fn append_lock(&self) -> &Mutex<()> {
        &self.append_lock
    }

    /// Perform a health check on the database connection
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PanosweepError::Storage(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Close the connection pool, waiting for checked-out connections
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("Sample database closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_creates_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gsv.db");

        let store = SqliteStore::new(SqliteConfig::new(&path).unwrap()).await.unwrap();

        assert!(path.exists());
        store.health_check().await.unwrap();
        assert!(!store.has_pending_migrations().await.unwrap());
        assert_eq!(store.current_version().await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_new_without_auto_run_leaves_schema_pending() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SqliteConfig::new(dir.path().join("gsv.db")).unwrap();
        config.migrations.auto_run = false;

        let store = SqliteStore::new(config.clone()).await.unwrap();
        assert!(store.has_pending_migrations().await.unwrap());
        store.close().await;

        let store = SqliteStore::with_migrations(config).await.unwrap();
        assert!(!store.has_pending_migrations().await.unwrap());
    }
}
