//! Configuration for the ingestion controller

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::record::DEFAULT_MAX_VALUE;
use crate::error::ConfigError;
use crate::statistics::StatsConfig;

/// Connection endpoint, timers and estimator tuning for one feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Upstream endpoint handed to the connector
    pub url: String,

    /// Close the connection after this long without an accepted record
    pub idle_timeout_ms: u64,

    /// How often the idle watchdog checks
    pub idle_check_interval_ms: u64,

    /// First reconnect delay
    pub backoff_base_ms: u64,

    /// Reconnect delay cap
    pub backoff_max_ms: u64,

    /// Largest accepted quote value
    pub max_value: f64,

    /// Text sent upstream right after every successful connect
    pub subscribe_message: Option<String>,

    /// Estimator tuning
    pub stats: StatsConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            idle_timeout_ms: 5_000,
            idle_check_interval_ms: 1_000,
            backoff_base_ms: 250,
            backoff_max_ms: 8_000,
            max_value: DEFAULT_MAX_VALUE,
            subscribe_message: None,
            stats: StatsConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Defaults pointed at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn idle_check_interval(&self) -> Duration {
        Duration::from_millis(self.idle_check_interval_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    /// Check every field is in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if self.idle_check_interval_ms == 0 {
            return Err(ConfigError::NotPositive {
                field: "idle_check_interval_ms",
            });
        }
        if self.idle_timeout_ms < self.idle_check_interval_ms {
            return Err(ConfigError::BelowMinimum {
                field: "idle_timeout_ms",
                value: self.idle_timeout_ms,
                min_field: "idle_check_interval_ms",
                min: self.idle_check_interval_ms,
            });
        }
        if self.backoff_base_ms == 0 {
            return Err(ConfigError::NotPositive {
                field: "backoff_base_ms",
            });
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(ConfigError::BelowMinimum {
                field: "backoff_max_ms",
                value: self.backoff_max_ms,
                min_field: "backoff_base_ms",
                min: self.backoff_base_ms,
            });
        }
        if !self.max_value.is_finite() || self.max_value <= 0.0 {
            return Err(ConfigError::InvalidThreshold {
                field: "max_value",
                value: self.max_value,
            });
        }
        self.stats.validate()
    }
}
