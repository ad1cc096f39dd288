//! Welford running mean and sample variance

use crate::traits::Sketch;

/// Single-pass mean and spread accumulator
///
/// Uses Welford's update so that long streams of nearly equal prices, such
/// as quotes around 1e9 that differ in the last digit, keep their variance
/// instead of cancelling to zero.
///
/// # Example
///
/// ```
/// use quotestats::statistics::RunningStats;
///
/// let mut stats = RunningStats::new();
/// for value in [1.0, 2.0, 4.0] {
///     stats.add(value);
/// }
///
/// assert_eq!(stats.len(), 3);
/// assert!((stats.mean().unwrap() - 7.0 / 3.0).abs() < 1e-12);
/// assert!((stats.sample_variance().unwrap() - 7.0 / 3.0).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RunningStats {
    n: u64,
    mean: f64,
    /// Sum of squared deviations from the running mean
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one value; NaN is skipped
    pub fn add(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }

        self.n += 1;
        let delta = value - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn len(&self) -> u64 {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// `None` until the first value
    pub fn mean(&self) -> Option<f64> {
        (self.n > 0).then_some(self.mean)
    }

    /// Variance with the `n - 1` denominator, `None` below two values
    pub fn sample_variance(&self) -> Option<f64> {
        (self.n > 1).then(|| self.m2 / (self.n - 1) as f64)
    }

    pub fn sample_stddev(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }
}

impl Sketch for RunningStats {
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
        self.n
    }
}
