//! Messages exchanged between the controller and its caller
//!
//! Commands and events serialize as `{"type": ..., "payload": ...}`:
//!
//! ```json
//! {"type": "start"}
//! {"type": "get-stats"}
//! {"type": "stats", "payload": {"mean": 10.5, "std": 0.71, "median": 10.0,
//!   "mode": 10.0, "lost": 0, "count": 2, "computeTimeMs": 0.0021}}
//! {"type": "anomaly", "payload": {"sequenceIndex": 21, "value": 100.0,
//!   "zScore": 4.36, "meanAtDetection": 14.76, "stdAtDetection": 19.54}}
//! ```

use serde::{Deserialize, Serialize};

use crate::statistics::{Anomaly, Snapshot};

/// Request sent to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Command {
    /// Begin ingesting with fresh statistics
    Start,
    /// Disconnect and cancel any pending reconnect
    Stop,
    /// Reply with a `stats` event
    GetStats,
    /// Clear the statistics and reply with the empty `stats` event
    Reset,
    /// Inject an outlier after the last accepted id
    SimulateAnomaly,
}

/// Notification emitted by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Event {
    Stats(Snapshot),
    Anomaly(Anomaly),
}
