//! Frequency estimation algorithms
//!
//! This module provides sketches for estimating key frequencies in a data
//! stream with bounded memory.
//!
//! # Algorithms
//!
//! - [`CountMinSketch`]: Classic count-min sketch over integer keys
//!
//! # Example
//!
//! ```
//! use quotestats::frequency::CountMinSketch;
//!
//! let mut cms = CountMinSketch::with_dimensions(2000, 5);
//!
//! cms.add(1050);
//! cms.add(1050);
//!
//! let count = cms.estimate(1050);
//! println!("Estimated count: {}", count);
//! ```

mod count_min;

pub use count_min::{CountMinSketch, DEFAULT_DEPTH, DEFAULT_WIDTH};
