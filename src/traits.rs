//! Core traits for the streaming estimators
//!
//! The bounded-memory structures implement the base [`Sketch`] trait, with
//! specialized traits for frequency and quantile estimation.

use core::fmt::Debug;

/// Core trait for all streaming sketches
pub trait Sketch: Clone + Debug {
    /// The type of item this sketch processes
    type Item: ?Sized;

    /// Add an item to the sketch
    fn update(&mut self, item: &Self::Item);

    /// Reset sketch to empty state
    fn clear(&mut self);

    /// Memory usage in bytes
    fn size_bytes(&self) -> usize;

    /// Number of items processed
    fn count(&self) -> u64;

    /// Check if sketch is empty
    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Frequency estimation sketches
///
/// Implementations must never under-count: the estimate for an item is
/// always at least the number of times it was added.
pub trait FrequencySketch: Sketch {
    /// Estimate frequency of an item
    fn estimate_frequency(&self, item: &Self::Item) -> u64;

    /// Check if frequency reaches threshold
    fn exceeds_threshold(&self, item: &Self::Item, threshold: u64) -> bool {
        self.estimate_frequency(item) >= threshold
    }
}

/// Running median estimators
pub trait QuantileSketch: Sketch<Item = f64> {
    /// Current median estimate, `None` before the first sample
    ///
    /// The estimate always lies within `[min(), max()]`.
    fn median(&self) -> Option<f64>;

    /// Get minimum value seen
    fn min(&self) -> Option<f64>;

    /// Get maximum value seen
    fn max(&self) -> Option<f64>;
}
