//! Configuration errors shared by the estimators and the ingestion layer

use thiserror::Error;

/// A configuration value is out of its accepted range
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A size parameter must be positive
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    /// A size parameter exceeds what the estimator can hold
    #[error("{field} must be at most {max}, got {value}")]
    TooLarge {
        field: &'static str,
        value: u64,
        max: u64,
    },

    /// A threshold must be a finite positive number
    #[error("{field} must be finite and positive, got {value}")]
    InvalidThreshold { field: &'static str, value: f64 },

    /// Two related settings contradict each other
    #[error("{field} ({value}) must be at least {min_field} ({min})")]
    BelowMinimum {
        field: &'static str,
        value: u64,
        min_field: &'static str,
        min: u64,
    },

    /// The upstream endpoint is missing
    #[error("upstream url must not be empty")]
    EmptyUrl,
}
