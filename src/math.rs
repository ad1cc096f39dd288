//! Small numeric helpers shared by the estimators and record validation

/// Largest integer an IEEE-754 double represents exactly (2^53 - 1)
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Round to a fixed number of decimal places
#[inline]
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (x * scale).round() / scale
}

/// Round to two decimal places, the precision reported in snapshots
#[inline]
pub fn round2(x: f64) -> f64 {
    round_to(x, 2)
}
