use panosweep_core::config::LayeredConfig;
use panosweep_core::error::{PanosweepError, Result};
use std::time::Duration;

/// Knobs for the discovery worker pool
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Number of concurrent workers
    pub workers: usize,
    /// Points claimed per store round trip
    pub batch_size: usize,
    /// Upper bound on a single lookup; exceeding it is a transient failure
    pub lookup_timeout: Duration,
    /// Age after which another worker may take over a claimed point.
    /// Renewed before every lookup, so it must outlast `lookup_timeout`.
    pub lease: Duration,
    /// Pause after each lookup, per worker
    pub request_interval: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Consecutive transient failures after which a worker gives up
    pub max_consecutive_failures: u32,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self::from_values(&LayeredConfig::with_defaults())
    }
}

impl CrawlOptions {
    /// Options from a validated configuration
    pub fn from_config(config: &LayeredConfig) -> Result<Self> {
        config.validate()?;
        let options = Self::from_values(config);
        options.validate()?;
        Ok(options)
    }

    /// Reject settings under which a crawl would silently do nothing or let
    /// two workers hold the same point
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(invalid("workers", "must be greater than 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "must be greater than 0".to_string()));
        }
        if self.lookup_timeout.is_zero() {
            return Err(invalid("lookup_timeout", "must be greater than 0".to_string()));
        }
        if self.lease <= self.lookup_timeout {
            return Err(invalid(
                "lease",
                format!(
                    "lease ({:?}) must be longer than lookup_timeout ({:?})",
                    self.lease, self.lookup_timeout
                ),
            ));
        }
        if self.backoff_base > self.backoff_max {
            return Err(invalid(
                "backoff_base",
                format!(
                    "backoff_base ({:?}) cannot be greater than backoff_max ({:?})",
                    self.backoff_base, self.backoff_max
                ),
            ));
        }
        Ok(())
    }

    fn from_values(config: &LayeredConfig) -> Self {
        Self {
            workers: config.workers.value,
            batch_size: config.batch_size.value,
            lookup_timeout: config.lookup_timeout(),
            lease: config.lease(),
            request_interval: config.request_interval(),
            backoff_base: Duration::from_millis(config.backoff_base_ms.value),
            backoff_max: Duration::from_millis(config.backoff_max_ms.value),
            max_consecutive_failures: config.max_consecutive_failures.value,
        }
    }
}

fn invalid(key: &str, reason: String) -> PanosweepError {
    PanosweepError::ConfigInvalid { key: key.to_string(), reason }
}
