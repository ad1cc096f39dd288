//! Three-marker P² running median
//!
//! A simplified form of the P² algorithm (Jain & Chlamtac, 1985) that keeps
//! only the minimum, the median estimate and the maximum. Memory is constant
//! regardless of stream length; accuracy degrades for heavy-tailed or bursty
//! inputs.

use crate::traits::{QuantileSketch, Sketch};

/// Per-sample advance of the desired marker ranks
const DESIRED_INCREMENTS: [f64; 3] = [0.0, 0.5, 1.0];

/// Running median estimator using three P² markers
///
/// Markers hold `[min, median estimate, max]`. After the first three samples
/// the middle marker is nudged one rank at a time toward its desired rank
/// using piecewise-parabolic interpolation, clamped to the current
/// `[min, max]` range.
///
/// # Example
///
/// ```
/// use quotestats::quantiles::P2Median;
/// use quotestats::traits::QuantileSketch;
///
/// let mut p2 = P2Median::new();
/// assert_eq!(p2.median(), None);
///
/// for i in 1..=1001 {
///     p2.add(i as f64);
/// }
///
/// let median = p2.median().unwrap();
/// assert!((median - 501.0).abs() < 5.0);
/// ```
#[derive(Clone, Debug)]
pub struct P2Median {
    /// Number of samples seen
    count: u64,
    /// Marker heights: min, median estimate, max
    heights: [f64; 3],
    /// Actual marker ranks (1-based)
    positions: [i64; 3],
    /// Desired marker ranks
    desired: [f64; 3],
}

impl Default for P2Median {
    fn default() -> Self {
        Self::new()
    }
}

impl P2Median {
    /// Create an empty estimator
    pub fn new() -> Self {
        Self {
            count: 0,
            heights: [0.0; 3],
            positions: [1, 2, 3],
            desired: [1.0, 1.5, 3.0],
        }
    }

    /// Add a sample
    ///
    /// NaN values are ignored.
    pub fn add(&mut self, x: f64) {
        if x.is_nan() {
            return;
        }

        self.count += 1;
        if self.count <= 3 {
            let filled = self.count as usize;
            self.heights[filled - 1] = x;
            self.heights[..filled].sort_by(f64::total_cmp);
            return;
        }

        let q = &mut self.heights;
        if x < q[0] {
            q[0] = x;
        }
        if x > q[2] {
            q[2] = x;
        }

        // Every marker above the cell the sample landed in moves up one rank.
        // With ranks frozen at [1, 2, 3] the move condition below never holds
        // and the middle marker would stay at the warm-up median forever.
        if x < q[1] {
            self.positions[1] += 1;
        }
        self.positions[2] += 1;

        for (desired, inc) in self.desired.iter_mut().zip(DESIRED_INCREMENTS) {
            *desired += inc;
        }

        let d = self.desired[1] - self.positions[1] as f64;
        let [p0, p1, p2] = self.positions;
        if (d >= 1.0 && p1 < p2 - 1) || (d <= -1.0 && p1 > p0 + 1) {
            let step = if d > 0.0 { 1 } else { -1 };
            let candidate = self.parabolic(step as f64);
            self.heights[1] = candidate.max(self.heights[0]).min(self.heights[2]);
            self.positions[1] += step;
        }
    }

    /// Piecewise-parabolic prediction for moving the middle marker by `s` ranks
    fn parabolic(&self, s: f64) -> f64 {
        let [q0, q1, q2] = self.heights;
        let [n0, n1, n2] = self.positions.map(|p| p as f64);

        q1 + s / (n2 - n0)
            * ((n1 - n0 + s) * (q2 - q1) / (n2 - n1) + (n2 - n1 - s) * (q1 - q0) / (n1 - n0))
    }

    /// Current median estimate
    ///
    /// Returns `None` before the first sample, the exact middle of the sorted
    /// samples while at most three were seen, and the middle marker afterwards.
    pub fn get(&self) -> Option<f64> {
        match self.count {
            0 => None,
            1..=3 => Some(self.heights[(self.count / 2) as usize]),
            _ => Some(self.heights[1]),
        }
    }

    /// Number of samples seen
    pub fn len(&self) -> u64 {
        self.count
    }
}

impl Sketch for P2Median {
    type Item = f64;

    fn update(&mut self, item: &f64) {
        self.add(*item);
    }

    fn clear(&mut self) {
        *self = Self::new();
    }

    fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
    }

    fn count(&self) -> u64 {
        self.count
    }
}

impl QuantileSketch for P2Median {
    fn median(&self) -> Option<f64> {
        self.get()
    }

    fn min(&self) -> Option<f64> {
        (self.count > 0).then(|| self.heights[0])
    }

    fn max(&self) -> Option<f64> {
        match self.count {
            0 => None,
            1..=3 => Some(self.heights[self.count as usize - 1]),
            _ => Some(self.heights[2]),
        }
    }
}
