//! Count-Min Sketch frequency estimator
//!
//! The Count-Min Sketch is a probabilistic data structure for estimating
//! the frequency of integer keys in a data stream.

use crate::traits::{FrequencySketch, Sketch};

/// Default number of counters per row
pub const DEFAULT_WIDTH: usize = 2000;

/// Default number of rows (hash functions)
pub const DEFAULT_DEPTH: usize = 5;

/// Odd multiplier of the 32-bit multiplicative hash (2^32 / golden ratio)
const MIX_MULTIPLIER: u32 = 0x9E37_79B1;

/// Count-Min Sketch for frequency estimation
///
/// The Count-Min Sketch provides frequency estimates with the following guarantees:
/// - Point query: `actual_count <= estimate <= actual_count + ε * N`
/// - Where ε = e/width and N is the total count
/// - Probability of exceeding the error bound: δ = e^-depth
///
/// Keys are hashed by truncating them to 32 bits, XOR-ing a per-row seed and
/// multiplying by a fixed odd constant with wraparound.
///
/// # Example
///
/// ```
/// use quotestats::frequency::CountMinSketch;
///
/// let mut cms = CountMinSketch::new();
///
/// cms.add(250);
/// cms.add(250);
/// cms.add(1200);
///
/// assert!(cms.estimate(250) >= 2);
/// assert!(cms.estimate(1200) >= 1);
/// assert_eq!(cms.estimate(7), 0);
/// ```
#[derive(Clone, Debug)]
pub struct CountMinSketch {
    /// Width of each row
    width: usize,
    /// Counter table, one row per hash function
    table: Vec<Vec<u32>>,
    /// Seeds for hash functions
    seeds: Vec<u32>,
    /// Total count of all items
    total_count: u64,
}

impl Default for CountMinSketch {
    fn default() -> Self {
        Self::new()
    }
}

impl CountMinSketch {
    /// Create a sketch with the default 2000x5 dimensions
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_WIDTH, DEFAULT_DEPTH)
    }

    /// Create a Count-Min Sketch with specific dimensions
    ///
    /// # Arguments
    ///
    /// * `width` - Width of each row (larger = lower error)
    /// * `depth` - Number of rows (larger = lower failure probability)
    ///
    /// # Panics
    ///
    /// Panics if `width` or `depth` is zero, or if `width` does not fit in 32 bits.
    pub fn with_dimensions(width: usize, depth: usize) -> Self {
        assert!(width > 0, "width must be positive");
        assert!(depth > 0, "depth must be positive");
        assert!(u32::try_from(width).is_ok(), "width must fit in 32 bits");

        let seeds = (0..depth as u32).map(|i| i.wrapping_mul(31).wrapping_add(7)).collect();

        Self {
            width,
            table: vec![vec![0u32; width]; depth],
            seeds,
            total_count: 0,
        }
    }

    /// Get the width of the sketch
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get the depth of the sketch
    pub fn depth(&self) -> usize {
        self.seeds.len()
    }

    /// Get the total count of all items
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Column of `key` in the row hashed with `seed`
    #[inline]
    fn column(&self, key: i64, seed: u32) -> usize {
        let mixed = ((key as u32) ^ seed).wrapping_mul(MIX_MULTIPLIER);
        (mixed % self.width as u32) as usize
    }

    /// Record one occurrence of `key`
    pub fn add(&mut self, key: i64) {
        self.total_count += 1;

        for row in 0..self.seeds.len() {
            let col = self.column(key, self.seeds[row]);
            let counter = &mut self.table[row][col];
            *counter = counter.saturating_add(1);
        }
    }

    /// Estimate the frequency of `key`
    ///
    /// Never less than the true number of `add(key)` calls.
    pub fn estimate(&self, key: i64) -> u32 {
        self.seeds
            .iter()
            .zip(&self.table)
            .map(|(&seed, row)| row[self.column(key, seed)])
            .min()
            .unwrap_or(0)
    }

    /// Theoretical error bound (epsilon * total_count)
    pub fn error_bound(&self) -> u64 {
        let epsilon = core::f64::consts::E / self.width as f64;
        (epsilon * self.total_count as f64) as u64
    }
}

impl Sketch for CountMinSketch {
    type Item = i64;

    fn update(&mut self, item: &i64) {
        self.add(*item);
    }

    fn clear(&mut self) {
        for row in &mut self.table {
            row.fill(0);
        }
        self.total_count = 0;
    }

    fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.table.len() * self.width * core::mem::size_of::<u32>()
            + self.seeds.len() * core::mem::size_of::<u32>()
    }

    fn count(&self) -> u64 {
        self.total_count
    }
}

impl FrequencySketch for CountMinSketch {
    fn estimate_frequency(&self, item: &i64) -> u64 {
        u64::from(self.estimate(*item))
    }
}
