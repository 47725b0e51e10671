//! SQLite configuration

use panosweep_core::config::LayeredConfig;
use panosweep_core::error::PanosweepError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(String),

    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// SQLite connection and behavior configuration
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path of the database file; created if missing
    pub database_path: PathBuf,
    /// Connection pool configuration
    pub pool: PoolConfig,
    /// Migration configuration
    pub migrations: MigrationConfig,
    /// How long a connection waits on a locked database before failing
    pub busy_timeout: Duration,
    /// Upper bound on committing a single transaction
    pub transaction_timeout: Duration,
}

impl SqliteConfig {
    /// Load configuration from environment variables
    ///
    /// Requires PANOSWEEP_DATABASE_PATH environment variable to be set.
    /// Other settings use defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("PANOSWEEP_DATABASE_PATH")
            .map_err(|_| ConfigError::Missing("PANOSWEEP_DATABASE_PATH".to_string()))?;
        Self::new(path)
    }

    /// Create a new configuration for the given database file
    pub fn new(database_path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self {
            database_path: database_path.into(),
            pool: PoolConfig::default(),
            migrations: MigrationConfig::default(),
            busy_timeout: Duration::from_secs(5),
            transaction_timeout: Duration::from_secs(30),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "database_path".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }

        if self.database_path.to_str().is_none() {
            return Err(ConfigError::Invalid {
                key: "database_path".to_string(),
                reason: "must be valid UTF-8".to_string(),
            });
        }

        if self.transaction_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "transaction_timeout".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        self.pool.validate()?;

        Ok(())
    }
}

impl TryFrom<&LayeredConfig> for SqliteConfig {
    type Error = ConfigError;

    fn try_from(config: &LayeredConfig) -> Result<Self, Self::Error> {
        config.validate().map_err(|e| match e {
            PanosweepError::ConfigInvalid { key, reason } => ConfigError::Invalid { key, reason },
            PanosweepError::ConfigMissing { key } => ConfigError::Missing(key),
            other => ConfigError::Invalid { key: "config".to_string(), reason: other.to_string() },
        })?;
        let mut sqlite = Self::new(config.database_path.value.clone())?;
        // Every worker may hold a connection while the reporter reads
        sqlite.pool.max_connections =
            sqlite.pool.max_connections.max(config.workers.value as u32 + 1);
        Ok(sqlite)
    }
}

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Maximum number of connections allowed
    pub max_connections: u32,
    /// Timeout for acquiring a connection from the pool
    pub acquire_timeout: Duration,
    /// Timeout for idle connections before they are closed
    pub idle_timeout: Duration,
    /// Maximum lifetime of a connection
    pub max_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl PoolConfig {
    /// Validate pool configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_connections > self.max_connections {
            return Err(ConfigError::Invalid {
                key: "pool.min_connections".to_string(),
                reason: format!(
                    "min_connections ({}) cannot be greater than max_connections ({})",
                    self.min_connections, self.max_connections
                ),
            });
        }

        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "pool.max_connections".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Migration configuration
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Whether `SqliteStore::new` applies pending migrations
    pub auto_run: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self { auto_run: true }
    }
}
