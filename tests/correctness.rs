//! Correctness and invariant tests for quotestats
//!
//! These tests verify properties that must always hold across the estimator
//! families. They complement the unit tests in each module by checking
//! behavior over long or randomized streams.
//!
//! Run with: cargo test --test correctness

use std::collections::HashMap;
use std::time::Duration;

use proptest::prelude::*;

use quotestats::backoff::Backoff;
use quotestats::frequency::CountMinSketch;
use quotestats::quantiles::P2Median;
use quotestats::statistics::{RunningStats, StatsConfig, StreamStats};
use quotestats::traits::{FrequencySketch, QuantileSketch, Sketch};

// ============================================================================
// Count-Min Sketch
// ============================================================================

mod count_min_sketch {
    use super::*;

    #[test]
    fn estimate_never_underestimates() {
        let mut cms = CountMinSketch::with_dimensions(64, 3);
        let mut exact: HashMap<i64, u32> = HashMap::new();

        for i in 0..5_000i64 {
            let key = (i * 7_919) % 613 - 300;
            cms.add(key);
            *exact.entry(key).or_default() += 1;
        }

        for (key, count) in &exact {
            assert!(
                cms.estimate(*key) >= *count,
                "estimate for {} was {} but the true count is {}",
                key,
                cms.estimate(*key),
                count
            );
        }
        assert_eq!(cms.total_count(), 5_000);
    }

    #[test]
    fn overestimate_stays_within_bound_for_most_keys() {
        let mut cms = CountMinSketch::new();
        let mut exact: HashMap<i64, u32> = HashMap::new();

        for i in 0..20_000i64 {
            let key = (i * 31 + 17) % 4_001;
            cms.add(key);
            *exact.entry(key).or_default() += 1;
        }

        let bound = cms.error_bound() as u32;
        let within = exact
            .iter()
            .filter(|(key, count)| cms.estimate(**key) <= **count + bound)
            .count();

        // Guarantee holds with probability 1 - e^-depth per key
        assert!(within * 100 >= exact.len() * 95);
    }

    #[test]
    fn unseen_keys_estimate_zero_when_sparse() {
        let mut cms = CountMinSketch::new();
        cms.add(1_001);
        assert_eq!(cms.estimate_frequency(&123_457), 0);
    }

    #[test]
    fn clear_resets_completely() {
        let mut cms = CountMinSketch::with_dimensions(100, 4);
        for i in 0..1_000 {
            cms.update(&i);
        }
        cms.clear();

        assert!(cms.is_empty());
        assert_eq!(cms.total_count(), 0);
        for i in 0..1_000 {
            assert_eq!(cms.estimate(i), 0);
        }
    }
}

// ============================================================================
// P² median
// ============================================================================

mod p2_median {
    use super::*;

    #[test]
    fn warm_up_matches_exact_median() {
        let mut p2 = P2Median::new();
        p2.add(9.0);
        assert_eq!(p2.median(), Some(9.0));
        p2.add(1.0);
        assert_eq!(p2.median(), Some(9.0));
        p2.add(5.0);
        assert_eq!(p2.median(), Some(5.0));
    }

    #[test]
    fn converges_on_permuted_range() {
        let mut p2 = P2Median::new();
        for i in 0..1_000u64 {
            p2.add(((i * 7_919) % 1_000) as f64);
        }

        let median = p2.median().unwrap();
        assert!(
            (median - 499.5).abs() < 25.0,
            "median of a permutation of 0..1000 estimated as {}",
            median
        );
        assert_eq!(p2.min(), Some(0.0));
        assert_eq!(p2.max(), Some(999.0));
    }

    #[test]
    fn constant_memory() {
        let mut p2 = P2Median::new();
        let before = p2.size_bytes();
        for i in 0..100_000 {
            p2.add(i as f64);
        }
        assert_eq!(p2.size_bytes(), before);
        assert_eq!(p2.count(), 100_000);
    }
}

// ============================================================================
// Running Stats
// ============================================================================

mod running_stats {
    use super::*;

    #[test]
    fn matches_two_pass_computation() {
        let values: Vec<f64> = (0..1_000).map(|i| ((i * 37) % 101) as f64 * 0.25 + 90.0).collect();

        let mut stats = RunningStats::new();
        for v in &values {
            stats.add(*v);
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);

        assert!((stats.mean().unwrap() - mean).abs() < 1e-9);
        assert!((stats.sample_variance().unwrap() - variance).abs() < 1e-6);
    }

    #[test]
    fn stable_with_large_offset() {
        let mut stats = RunningStats::new();
        for i in 0..1_000 {
            stats.add(1e9 + (i % 2) as f64);
        }
        let std = stats.sample_stddev().unwrap();
        assert!((std - 0.50025).abs() < 1e-3, "std = {}", std);
    }

    #[test]
    fn nan_values_are_ignored() {
        let mut stats = RunningStats::new();
        stats.add(1.0);
        stats.add(f64::NAN);
        stats.add(3.0);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats.mean(), Some(2.0));
    }
}

// ============================================================================
// Stream Stats
// ============================================================================

mod stream_stats {
    use super::*;

    #[test]
    fn memory_stays_bounded_on_high_cardinality_stream() {
        let mut stats = StreamStats::new(StatsConfig::default());
        for i in 0..50_000u64 {
            stats.add(i, (i % 9_973) as f64 * 0.01 + 100.0);
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.count, 50_000);
        assert_eq!(snapshot.lost, 0);
        assert!(snapshot.mode.is_some());
        let debug = format!("{:?}", stats);
        assert!(debug.contains("candidates"));
    }

    #[test]
    fn snapshot_is_read_only() {
        let mut stats = StreamStats::new(StatsConfig::default());
        for (i, v) in [3.0, 1.0, 4.0, 1.0, 5.0].into_iter().enumerate() {
            stats.add(i as u64, v);
        }

        let first = stats.snapshot();
        let second = stats.snapshot();
        assert_eq!(first.mean, second.mean);
        assert_eq!(first.median, second.median);
        assert_eq!(first.mode, second.mode);
        assert_eq!(first.mode, Some(1.0));
    }

    #[test]
    fn mean_and_std_are_rounded() {
        let mut stats = StreamStats::new(StatsConfig::default());
        for (i, v) in [0.1, 0.2, 0.3].into_iter().enumerate() {
            stats.add(i as u64, v);
        }
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.mean, Some(0.2));
        assert_eq!(snapshot.std, Some(0.1));
    }
}

// ============================================================================
// Backoff
// ============================================================================

mod backoff {
    use super::*;

    #[test]
    fn delays_double_until_capped() {
        let mut backoff =
            Backoff::with_seed(Duration::from_millis(100), Duration::from_millis(1_000), 7);

        for raw in [100u64, 200, 400, 800, 1_000, 1_000, 1_000] {
            let delay = backoff.next().as_millis() as u64;
            assert!(
                delay >= raw * 9 / 10 && delay <= raw * 11 / 10,
                "delay {} outside jitter range of {}",
                delay,
                raw
            );
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let base = Duration::from_millis(250);
        let max = Duration::from_secs(8);
        let mut a = Backoff::with_seed(base, max, 42);
        let mut b = Backoff::with_seed(base, max, 42);

        for _ in 0..10 {
            assert_eq!(a.next(), b.next());
        }
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_count_min_never_undercounts(keys in prop::collection::vec(-500i64..500, 1..2_000)) {
        let mut cms = CountMinSketch::with_dimensions(50, 3);
        let mut exact: HashMap<i64, u32> = HashMap::new();
        for key in &keys {
            cms.add(*key);
            *exact.entry(*key).or_default() += 1;
        }

        for (key, count) in exact {
            prop_assert!(cms.estimate(key) >= count);
        }
        prop_assert_eq!(cms.total_count(), keys.len() as u64);
    }

    #[test]
    fn prop_p2_median_within_observed_range(values in prop::collection::vec(-1e6f64..1e6, 1..500)) {
        let mut p2 = P2Median::new();
        for v in &values {
            p2.add(*v);
        }

        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let median = p2.median().unwrap();

        prop_assert!(median >= lo && median <= hi);
        prop_assert_eq!(p2.min(), Some(lo));
        prop_assert_eq!(p2.max(), Some(hi));
    }

    #[test]
    fn prop_lost_equals_sum_of_gaps(steps in prop::collection::vec(1u64..20, 1..300)) {
        let mut stats = StreamStats::new(StatsConfig::default());
        let mut id = 0u64;
        let mut expected = 0u64;
        for (i, step) in steps.iter().enumerate() {
            id += step;
            if i > 0 {
                expected += step - 1;
            }
            stats.add(id, 1.0);
        }

        let snapshot = stats.snapshot();
        prop_assert_eq!(snapshot.lost, expected);
        prop_assert_eq!(snapshot.count, steps.len() as u64);
    }

    #[test]
    fn prop_backoff_stays_in_jitter_band(seed in any::<u64>(), base in 1u64..1_000, attempts in 1usize..20) {
        let max = base * 16;
        let mut backoff = Backoff::with_seed(Duration::from_millis(base), Duration::from_millis(max), seed);

        for k in 0..attempts {
            let raw = (base << k.min(4)).min(max) as f64;
            let delay = backoff.next().as_millis() as f64;
            prop_assert!(delay >= (raw * 0.9).floor() && delay <= raw * 1.1);
        }
    }
}
