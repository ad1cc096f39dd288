//! Statistical summaries for streaming data
//!
//! This module provides single-pass, constant-memory statistics over streams:
//! the Welford accumulator [`RunningStats`] and the composite [`StreamStats`]
//! engine that adds a median, an approximate mode, gap counting and anomaly
//! detection on top of it.
//!
//! # Example
//!
//! ```
//! use quotestats::statistics::{StatsConfig, StreamStats};
//!
//! let mut stats = StreamStats::with_sink(StatsConfig::default(), |anomaly| {
//!     println!("anomaly at #{}: z = {:.2}", anomaly.sequence_index, anomaly.z_score);
//! });
//!
//! for (id, value) in [(1, 10.0), (2, 10.5), (4, 9.5)] {
//!     stats.add(id, value);
//! }
//!
//! let snapshot = stats.snapshot();
//! println!("mean: {:?}, lost: {}", snapshot.mean, snapshot.lost);
//! ```

mod moments;
mod stream;

pub use moments::RunningStats;
pub use stream::{Anomaly, AnomalySink, Snapshot, StatsConfig, StreamStats, MAX_TOP_K};
