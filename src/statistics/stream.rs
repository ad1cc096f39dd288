//! Composite running statistics over a numbered observation stream
//!
//! [`StreamStats`] combines a Welford accumulator, a P² median tracker and a
//! Count-Min Sketch into one engine that also counts sequence gaps and flags
//! z-score anomalies as values arrive.

use std::fmt;
use std::time::Instant;

use crate::error::ConfigError;
use crate::frequency::{CountMinSketch, DEFAULT_DEPTH, DEFAULT_WIDTH};
use crate::math::{round2, round_to};
use crate::quantiles::P2Median;
use crate::statistics::RunningStats;

/// Quantization scale for mode keys (0.01 resolution)
const MODE_SCALE: f64 = 100.0;

/// Candidate table grows to this multiple of `top_k` before it is pruned
const CANDIDATE_SLACK: usize = 4;

/// Largest accepted `top_k`
pub const MAX_TOP_K: usize = 1024;

/// Tuning for [`StreamStats`]
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StatsConfig {
    /// Counters per Count-Min row
    pub sketch_width: usize,
    /// Count-Min rows
    pub sketch_depth: usize,
    /// Mode candidates kept after each prune
    pub top_k: usize,
    /// Absolute z-score above which a sample is reported as an anomaly
    pub anomaly_z_threshold: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            sketch_width: DEFAULT_WIDTH,
            sketch_depth: DEFAULT_DEPTH,
            top_k: 8,
            anomaly_z_threshold: 2.0,
        }
    }
}

impl StatsConfig {
    /// Check every field is in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sketch_width == 0 {
            return Err(ConfigError::NotPositive { field: "sketch_width" });
        }
        if u32::try_from(self.sketch_width).is_err() {
            return Err(ConfigError::TooLarge {
                field: "sketch_width",
                value: self.sketch_width as u64,
                max: u64::from(u32::MAX),
            });
        }
        if self.sketch_depth == 0 {
            return Err(ConfigError::NotPositive { field: "sketch_depth" });
        }
        if self.top_k == 0 {
            return Err(ConfigError::NotPositive { field: "top_k" });
        }
        if self.top_k > MAX_TOP_K {
            return Err(ConfigError::TooLarge {
                field: "top_k",
                value: self.top_k as u64,
                max: MAX_TOP_K as u64,
            });
        }
        if !self.anomaly_z_threshold.is_finite() || self.anomaly_z_threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold {
                field: "anomaly_z_threshold",
                value: self.anomaly_z_threshold,
            });
        }
        Ok(())
    }
}

/// Point-in-time view of the running statistics
///
/// Floating values are rounded to two decimals; `None` means "not enough
/// samples yet".
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Snapshot {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub median: Option<f64>,
    pub mode: Option<f64>,
    /// Observations missing from gaps in accepted ids
    pub lost: u64,
    /// Accepted observations since the last reset
    pub count: u64,
    /// Wall time spent building this snapshot
    pub compute_time_ms: f64,
}

/// A sample whose z-score exceeded the configured threshold
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Anomaly {
    /// Running sample count when the anomaly was seen, not the event id
    pub sequence_index: u64,
    pub value: f64,
    pub z_score: f64,
    pub mean_at_detection: f64,
    pub std_at_detection: f64,
}

/// Receiver for anomalies raised during [`StreamStats::add`]
pub type AnomalySink = Box<dyn FnMut(Anomaly) + Send>;

/// Running mean/std/median/mode with loss accounting and anomaly detection
///
/// Memory is bounded by the sketch dimensions and `4 * top_k` mode
/// candidates, independent of how many samples are added.
///
/// # Example
///
/// ```
/// use quotestats::statistics::{StatsConfig, StreamStats};
///
/// let mut stats = StreamStats::new(StatsConfig::default());
/// stats.add(100, 10.0);
/// stats.add(103, 12.0);
///
/// let snap = stats.snapshot();
/// assert_eq!(snap.count, 2);
/// assert_eq!(snap.lost, 2);
/// assert_eq!(snap.mean, Some(11.0));
/// ```
pub struct StreamStats {
    config: StatsConfig,
    moments: RunningStats,
    median: P2Median,
    sketch: CountMinSketch,
    /// Quantized key and its sketch estimate when last seen, in first-seen order
    candidates: Vec<(i64, u32)>,
    prev_id: Option<u64>,
    lost: u64,
    sink: Option<AnomalySink>,
}

impl fmt::Debug for StreamStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamStats")
            .field("config", &self.config)
            .field("count", &self.moments.len())
            .field("prev_id", &self.prev_id)
            .field("lost", &self.lost)
            .field("candidates", &self.candidates.len())
            .field("has_sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl StreamStats {
    /// Create an engine without an anomaly receiver
    ///
    /// # Panics
    ///
    /// Panics if the sketch dimensions in `config` are zero.
    pub fn new(config: StatsConfig) -> Self {
        let sketch = CountMinSketch::with_dimensions(config.sketch_width, config.sketch_depth);
        Self {
            moments: RunningStats::new(),
            median: P2Median::new(),
            sketch,
            candidates: Vec::with_capacity(config.top_k.min(MAX_TOP_K) * CANDIDATE_SLACK + 1),
            prev_id: None,
            lost: 0,
            sink: None,
            config,
        }
    }

    /// Create an engine that reports anomalies to `sink`
    pub fn with_sink(config: StatsConfig, sink: impl FnMut(Anomaly) + Send + 'static) -> Self {
        let mut stats = Self::new(config);
        stats.sink = Some(Box::new(sink));
        stats
    }

    /// Id of the last accepted observation
    pub fn prev_id(&self) -> Option<u64> {
        self.prev_id
    }

    /// Accepted observations since the last reset
    pub fn count(&self) -> u64 {
        self.moments.len()
    }

    /// Missing observations counted so far
    pub fn lost(&self) -> u64 {
        self.lost
    }

    /// Unrounded running mean
    pub fn mean(&self) -> Option<f64> {
        self.moments.mean()
    }

    /// Unrounded sample standard deviation
    pub fn std(&self) -> Option<f64> {
        self.moments.sample_stddev()
    }

    /// Fold one observation into every estimator
    ///
    /// Ordering is not validated here: callers drop ids at or below
    /// [`prev_id`](Self::prev_id) beforehand. Such ids never add to `lost`.
    /// A non-finite `value` is skipped entirely, id included.
    pub fn add(&mut self, id: u64, value: f64) {
        if !value.is_finite() {
            return;
        }

        if let Some(prev) = self.prev_id {
            self.lost += id.saturating_sub(prev.saturating_add(1));
        }
        self.prev_id = Some(id);

        self.moments.add(value);
        self.median.add(value);
        self.track_mode(value);
        self.check_anomaly(value);
    }

    fn quantize(value: f64) -> i64 {
        (value * MODE_SCALE).round() as i64
    }

    fn track_mode(&mut self, value: f64) {
        let key = Self::quantize(value);
        self.sketch.add(key);
        let estimate = self.sketch.estimate(key);

        match self.candidates.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = estimate,
            None => self.candidates.push((key, estimate)),
        }

        // A key evicted here only returns once it is seen again; the true mode
        // can be lost if noise briefly outranks it.
        if self.candidates.len() > self.config.top_k.saturating_mul(CANDIDATE_SLACK) {
            self.candidates.sort_by(|a, b| b.1.cmp(&a.1));
            self.candidates.truncate(self.config.top_k);
        }
    }

    fn check_anomaly(&mut self, value: f64) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let (Some(mean), Some(std)) = (self.moments.mean(), self.moments.sample_stddev()) else {
            return;
        };
        if std <= 0.0 {
            return;
        }

        let z_score = (value - mean) / std;
        if z_score.abs() > self.config.anomaly_z_threshold {
            sink(Anomaly {
                sequence_index: self.moments.len(),
                value,
                z_score,
                mean_at_detection: round2(mean),
                std_at_detection: round2(std),
            });
        }
    }

    /// Current most frequent quantized value, re-queried from the sketch
    fn mode(&self) -> Option<f64> {
        let mut best: Option<(i64, u32)> = None;
        for &(key, _) in &self.candidates {
            let estimate = self.sketch.estimate(key);
            if best.map_or(true, |(_, top)| estimate > top) {
                best = Some((key, estimate));
            }
        }
        best.map(|(key, _)| key as f64 / MODE_SCALE)
    }

    /// Build a snapshot of every estimate
    pub fn snapshot(&self) -> Snapshot {
        let started = Instant::now();

        let mean = self.moments.mean().map(round2);
        let std = self.moments.sample_stddev().map(round2);
        let median = self.median.get().map(round2);
        let mode = self.mode().map(round2);

        let compute_time_ms = round_to(started.elapsed().as_secs_f64() * 1000.0, 4);

        Snapshot {
            mean,
            std,
            median,
            mode,
            lost: self.lost,
            count: self.moments.len(),
            compute_time_ms,
        }
    }

    /// Return to the empty state, keeping the configuration and anomaly sink
    pub fn reset(&mut self) {
        self.moments = RunningStats::new();
        self.median = P2Median::new();
        self.sketch = CountMinSketch::with_dimensions(self.config.sketch_width, self.config.sketch_depth);
        self.candidates.clear();
        self.prev_id = None;
        self.lost = 0;
    }
}
