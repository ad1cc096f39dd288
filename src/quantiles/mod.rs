//! Quantile estimation algorithms
//!
//! This module provides estimators for tracking quantiles of a data stream
//! in constant memory.
//!
//! # Algorithms
//!
//! - [`P2Median`]: Three-marker P² running median
//!
//! # Example
//!
//! ```
//! use quotestats::quantiles::P2Median;
//! use quotestats::traits::QuantileSketch;
//!
//! let mut p2 = P2Median::new();
//!
//! for value in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0] {
//!     p2.add(value);
//! }
//!
//! let median = p2.median();
//! println!("Median: {:?}", median);
//! ```

mod p2;

pub use p2::P2Median;
