//! Errors raised while ingesting the upstream feed; none of them are fatal

use thiserror::Error;

/// Failure of the upstream connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// Opening the connection failed
    #[error("connect failed: {0}")]
    Connect(String),

    /// Reading, writing or closing failed on an open connection
    #[error("transport error: {0}")]
    Transport(String),

    /// The connection is already closed
    #[error("connection closed")]
    Closed,
}

/// The controller task is no longer receiving commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ingestion controller has shut down")]
pub struct ControllerGone;

/// Why an inbound record was dropped
#[derive(Debug, Error)]
pub enum RecordError {
    /// The frame is not valid JSON
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame is JSON but not an object
    #[error("record is not a JSON object")]
    NotAnObject,

    /// `id` is missing, negative, fractional or beyond 2^53 - 1
    #[error("id must be a non-negative safe integer")]
    InvalidId,

    /// `value` is missing, non-finite or outside `[0, max]`
    #[error("value must be a finite number in [0, {max}]")]
    InvalidValue { max: f64 },
}
