//! Review session configuration.

use std::time::Duration;

use tracing::debug;

use triage_core::{defaults, env, Error, Result};

/// Settings for the inbox loader and review session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewConfig {
    /// Tag whose pages make up the inbox.
    pub tag: String,
    /// Pages fetched per loader invocation.
    pub batch_size: usize,
    /// Readahead fires once the cursor is this close to the loaded end.
    pub prefetch_threshold: usize,
    /// Delay before navigation status settles to complete.
    pub status_settle: Duration,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            tag: defaults::INBOX_TAG.to_string(),
            batch_size: defaults::BATCH_SIZE,
            prefetch_threshold: defaults::PREFETCH_THRESHOLD,
            status_settle: Duration::from_millis(defaults::STATUS_SETTLE_MS),
        }
    }
}

impl ReviewConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// Reads `TRIAGE_TAG`, `TRIAGE_BATCH_SIZE`, `TRIAGE_PREFETCH_THRESHOLD`
    /// and `TRIAGE_STATUS_SETTLE_MS`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            tag: env::var("TRIAGE_TAG").unwrap_or(defaults.tag),
            batch_size: env::parse("TRIAGE_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            prefetch_threshold: env::parse("TRIAGE_PREFETCH_THRESHOLD")?
                .unwrap_or(defaults.prefetch_threshold),
            status_settle: env::parse("TRIAGE_STATUS_SETTLE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.status_settle),
        };
        config.validate()?;
        debug!(?config, "Review config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tag.trim().is_empty() {
            return Err(Error::Config("inbox tag must not be empty".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch size must be at least 1".to_string()));
        }
        if self.prefetch_threshold > defaults::MAX_PREFETCH_THRESHOLD {
            return Err(Error::Config(format!(
                "prefetch threshold {} exceeds {}",
                self.prefetch_threshold,
                defaults::MAX_PREFETCH_THRESHOLD
            )));
        }
        Ok(())
    }
}
