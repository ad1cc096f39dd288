//! # Quotestats
//!
//! Bounded-memory running statistics over a lossy, numbered quote stream.
//!
//! Quotestats keeps a running mean and standard deviation, a P² median and a
//! Count-Min based mode over an unbounded stream of `(id, value)` quotes. It
//! counts observations lost to gaps in the id sequence and flags samples
//! whose z-score crosses a threshold. The `ingest` layer drives all of this
//! from an upstream connection with jittered reconnects and an idle watchdog.
//!
//! ## Quick Start
//!
//! ```rust
//! use quotestats::prelude::*;
//!
//! let mut stats = StreamStats::new(StatsConfig::default());
//! for (id, value) in [(1, 101.25), (2, 101.5), (5, 101.25)] {
//!     stats.add(id, value);
//! }
//!
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.count, 3);
//! assert_eq!(snapshot.lost, 2);
//! assert_eq!(snapshot.mode, Some(101.25));
//! ```
//!
//! ## Estimators
//!
//! Each building block is usable on its own:
//!
//! ```rust
//! use quotestats::frequency::CountMinSketch;
//! use quotestats::quantiles::P2Median;
//! use quotestats::traits::{FrequencySketch, QuantileSketch};
//!
//! let mut cms = CountMinSketch::new();
//! cms.add(42);
//! cms.add(42);
//! assert!(cms.estimate_frequency(&42) >= 2);
//!
//! let mut p2 = P2Median::new();
//! for v in [3.0, 1.0, 2.0] {
//!     p2.add(v);
//! }
//! assert_eq!(p2.median(), Some(2.0));
//! ```
//!
//! ## Feature Flags
//!
//! - `ingest` (default): connection lifecycle, record validation and the
//!   command/event protocol (tokio, tracing)
//! - `ws`: WebSocket connector built on tokio-tungstenite
//! - `cli`: the `quotestats` binary
//! - `serde`: serialization of snapshots, anomalies and configs
//! - `full`: everything

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod traits;

pub mod backoff;
pub mod error;
pub mod frequency;
pub mod math;
pub mod quantiles;
pub mod statistics;

#[cfg(feature = "ingest")]
#[cfg_attr(docsrs, doc(cfg(feature = "ingest")))]
pub mod ingest;

pub mod prelude {
    pub use crate::traits::*;

    pub use crate::backoff::Backoff;
    pub use crate::error::ConfigError;
    pub use crate::frequency::CountMinSketch;
    pub use crate::quantiles::P2Median;
    pub use crate::statistics::{Anomaly, RunningStats, Snapshot, StatsConfig, StreamStats};

    #[cfg(feature = "ingest")]
    pub use crate::ingest::{Command, Event, IngestConfig, IngestionHandle};
}

pub use error::ConfigError;
pub use statistics::{Snapshot, StatsConfig, StreamStats};
