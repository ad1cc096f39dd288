//! Jittered exponential backoff for reconnect scheduling

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Capped exponential delay generator with ±10% jitter
///
/// The raw delay is `min(max, base * 2^attempt)` and the returned delay is
/// drawn uniformly from `[0.9 * raw, 1.1 * raw)`, truncated to whole
/// milliseconds. The attempt counter stops growing once the raw delay has
/// reached `max`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use quotestats::backoff::Backoff;
///
/// let mut backoff = Backoff::new(Duration::from_millis(250), Duration::from_secs(8));
///
/// let first = backoff.next();
/// assert!(first >= Duration::from_millis(225) && first < Duration::from_millis(275));
///
/// backoff.reset();
/// assert_eq!(backoff.attempt(), 0);
/// ```
#[derive(Clone, Debug)]
pub struct Backoff {
    /// Delay of the first attempt in milliseconds
    base_ms: u64,
    /// Upper bound of the raw delay in milliseconds
    max_ms: u64,
    /// Failed attempts since the last reset
    attempt: u32,
    /// Jitter source
    rng: StdRng,
}

impl Backoff {
    /// Create a backoff seeded from the operating system
    ///
    /// # Panics
    ///
    /// Panics if `base` is below one millisecond or `max` is below `base`.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self::with_rng(base, max, StdRng::from_entropy())
    }

    /// Create a backoff with a fixed jitter seed (for reproducibility)
    pub fn with_seed(base: Duration, max: Duration, seed: u64) -> Self {
        Self::with_rng(base, max, StdRng::seed_from_u64(seed))
    }

    fn with_rng(base: Duration, max: Duration, rng: StdRng) -> Self {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        assert!(base_ms > 0, "base delay must be at least 1ms");
        assert!(max_ms >= base_ms, "max delay must not be below base delay");

        Self {
            base_ms,
            max_ms,
            attempt: 0,
            rng,
        }
    }

    /// Failed attempts counted since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next reconnect attempt
    pub fn next(&mut self) -> Duration {
        let scaled = 1u64
            .checked_shl(self.attempt)
            .and_then(|factor| self.base_ms.checked_mul(factor))
            .unwrap_or(u64::MAX);

        let raw_ms = if scaled < self.max_ms {
            self.attempt += 1;
            scaled
        } else {
            self.max_ms
        };

        let raw = raw_ms as f64;
        let jitter = self.rng.gen::<f64>() * raw * 0.2;
        Duration::from_millis((raw * 0.9 + jitter).floor() as u64)
    }

    /// Start over from the base delay
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
