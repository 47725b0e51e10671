use crate::error::{PanosweepError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Set explicitly by the embedding program
    Override,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Override => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for a sweep: defaults < file < environment < overrides
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub database_path: ConfigValue<PathBuf>,
    pub sample_interval_meters: ConfigValue<f64>,
    pub workers: ConfigValue<usize>,
    pub batch_size: ConfigValue<usize>,
    pub lookup_timeout_secs: ConfigValue<u64>,
    pub lease_secs: ConfigValue<u64>,
    pub request_interval_ms: ConfigValue<u64>,
    pub backoff_base_ms: ConfigValue<u64>,
    pub backoff_max_ms: ConfigValue<u64>,
    pub max_consecutive_failures: ConfigValue<u32>,
    pub export_path: ConfigValue<PathBuf>,
    pub lookup_api_key: ConfigValue<Option<String>>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            database_path: ConfigValue::new(PathBuf::from("gsv.db"), ConfigSource::Default),
            sample_interval_meters: ConfigValue::new(5.0, ConfigSource::Default),
            workers: ConfigValue::new(4, ConfigSource::Default),
            batch_size: ConfigValue::new(64, ConfigSource::Default),
            lookup_timeout_secs: ConfigValue::new(10, ConfigSource::Default),
            lease_secs: ConfigValue::new(300, ConfigSource::Default),
            request_interval_ms: ConfigValue::new(0, ConfigSource::Default),
            backoff_base_ms: ConfigValue::new(500, ConfigSource::Default),
            backoff_max_ms: ConfigValue::new(60_000, ConfigSource::Default),
            max_consecutive_failures: ConfigValue::new(20, ConfigSource::Default),
            export_path: ConfigValue::new(PathBuf::from("panoramas.tsv"), ConfigSource::Default),
            lookup_api_key: ConfigValue::new(None, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| PanosweepError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| PanosweepError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        let source = ConfigSource::File;
        if let Some(v) = file_config.database_path {
            self.database_path.update(v, source);
        }
        if let Some(v) = file_config.sample_interval_meters {
            self.sample_interval_meters.update(v, source);
        }
        if let Some(v) = file_config.workers {
            self.workers.update(v, source);
        }
        if let Some(v) = file_config.batch_size {
            self.batch_size.update(v, source);
        }
        if let Some(v) = file_config.lookup_timeout_secs {
            self.lookup_timeout_secs.update(v, source);
        }
        if let Some(v) = file_config.lease_secs {
            self.lease_secs.update(v, source);
        }
        if let Some(v) = file_config.request_interval_ms {
            self.request_interval_ms.update(v, source);
        }
        if let Some(v) = file_config.backoff_base_ms {
            self.backoff_base_ms.update(v, source);
        }
        if let Some(v) = file_config.backoff_max_ms {
            self.backoff_max_ms.update(v, source);
        }
        if let Some(v) = file_config.max_consecutive_failures {
            self.max_consecutive_failures.update(v, source);
        }
        if let Some(v) = file_config.export_path {
            self.export_path.update(v, source);
        }
        if let Some(v) = file_config.lookup_api_key {
            self.lookup_api_key.update(Some(v), source);
        }

        Ok(self)
    }

    /// Load configuration from `PANOSWEEP_*` environment variables
    pub fn load_from_env(mut self) -> Self {
        let source = ConfigSource::Environment;

        if let Ok(path) = env::var("PANOSWEEP_DATABASE_PATH") {
            self.database_path.update(PathBuf::from(path), source);
        }
        if let Some(v) = parse_env("PANOSWEEP_SAMPLE_INTERVAL_METERS", "a number of meters") {
            self.sample_interval_meters.update(v, source);
        }
        if let Some(v) = parse_env("PANOSWEEP_WORKERS", "a positive integer") {
            self.workers.update(v, source);
        }
        if let Some(v) = parse_env("PANOSWEEP_BATCH_SIZE", "a positive integer") {
            self.batch_size.update(v, source);
        }
        if let Some(v) = parse_env("PANOSWEEP_LOOKUP_TIMEOUT_SECS", "whole seconds") {
            self.lookup_timeout_secs.update(v, source);
        }
        if let Some(v) = parse_env("PANOSWEEP_LEASE_SECS", "whole seconds") {
            self.lease_secs.update(v, source);
        }
        if let Some(v) = parse_env("PANOSWEEP_REQUEST_INTERVAL_MS", "whole milliseconds") {
            self.request_interval_ms.update(v, source);
        }
        if let Ok(path) = env::var("PANOSWEEP_EXPORT_PATH") {
            self.export_path.update(PathBuf::from(path), source);
        }
        if let Ok(key) = env::var("PANOSWEEP_LOOKUP_API_KEY") {
            if !key.trim().is_empty() {
                self.lookup_api_key.update(Some(key), source);
            }
        }

        self
    }

    /// Apply explicit overrides from the embedding program
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        let source = ConfigSource::Override;

        if let Some(v) = overrides.database_path {
            self.database_path.update(v, source);
        }
        if let Some(v) = overrides.sample_interval_meters {
            self.sample_interval_meters.update(v, source);
        }
        if let Some(v) = overrides.workers {
            self.workers.update(v, source);
        }
        if let Some(v) = overrides.batch_size {
            self.batch_size.update(v, source);
        }
        if let Some(v) = overrides.export_path {
            self.export_path.update(v, source);
        }
    }

    /// Check the values that would otherwise fail deep inside a run
    pub fn validate(&self) -> Result<()> {
        let interval = self.sample_interval_meters.value;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(PanosweepError::ConfigInvalid {
                key: "sample_interval_meters".to_string(),
                reason: format!("must be a positive number, got {}", interval),
            });
        }
        if self.workers.value == 0 {
            return Err(PanosweepError::ConfigInvalid {
                key: "workers".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.batch_size.value == 0 {
            return Err(PanosweepError::ConfigInvalid {
                key: "batch_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.lookup_timeout_secs.value == 0 {
            return Err(PanosweepError::ConfigInvalid {
                key: "lookup_timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.lease_secs.value <= self.lookup_timeout_secs.value {
            return Err(PanosweepError::ConfigInvalid {
                key: "lease_secs".to_string(),
                reason: format!(
                    "lease_secs ({}) must be greater than lookup_timeout_secs ({})",
                    self.lease_secs.value, self.lookup_timeout_secs.value
                ),
            });
        }
        if self.backoff_base_ms.value > self.backoff_max_ms.value {
            return Err(PanosweepError::ConfigInvalid {
                key: "backoff_base_ms".to_string(),
                reason: format!(
                    "backoff_base_ms ({}) cannot be greater than backoff_max_ms ({})",
                    self.backoff_base_ms.value, self.backoff_max_ms.value
                ),
            });
        }
        Ok(())
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs.value)
    }

    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs.value)
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms.value)
    }

    /// Get all configuration values as a map for inspection.
    ///
    /// The API key is masked.
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "database_path".to_string(),
            (self.database_path.value.display().to_string(), self.database_path.source),
        );
        map.insert(
            "sample_interval_meters".to_string(),
            (self.sample_interval_meters.value.to_string(), self.sample_interval_meters.source),
        );
        map.insert("workers".to_string(), (self.workers.value.to_string(), self.workers.source));
        map.insert(
            "batch_size".to_string(),
            (self.batch_size.value.to_string(), self.batch_size.source),
        );
        map.insert(
            "lookup_timeout_secs".to_string(),
            (self.lookup_timeout_secs.value.to_string(), self.lookup_timeout_secs.source),
        );
        map.insert(
            "lease_secs".to_string(),
            (self.lease_secs.value.to_string(), self.lease_secs.source),
        );
        map.insert(
            "export_path".to_string(),
            (self.export_path.value.display().to_string(), self.export_path.source),
        );
        let key_display = match self.lookup_api_key.value {
            Some(_) => "********".to_string(),
            None => "(unset)".to_string(),
        };
        map.insert("lookup_api_key".to_string(), (key_display, self.lookup_api_key.source));

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    database_path: Option<PathBuf>,
    sample_interval_meters: Option<f64>,
    workers: Option<usize>,
    batch_size: Option<usize>,
    lookup_timeout_secs: Option<u64>,
    lease_secs: Option<u64>,
    request_interval_ms: Option<u64>,
    backoff_base_ms: Option<u64>,
    backoff_max_ms: Option<u64>,
    max_consecutive_failures: Option<u32>,
    export_path: Option<PathBuf>,
    lookup_api_key: Option<String>,
}

/// Explicit overrides supplied by the embedding program
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub sample_interval_meters: Option<f64>,
    pub workers: Option<usize>,
    pub batch_size: Option<usize>,
    pub export_path: Option<PathBuf>,
}

fn parse_env<T: FromStr>(name: &str, expected: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} value '{}': expected {}", name, raw, expected);
            None
        }
    }
}
