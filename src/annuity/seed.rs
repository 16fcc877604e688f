//! Baily-type starting rate for the Newton phase

/// Floor applied to the seed so Newton never starts at or below zero
pub const MIN_SEED: f64 = 1e-6;

/// Starting rate estimate from the ratio of undiscounted payments to price
///
/// Only used to initialise the root finder, never returned as a result.
pub fn initial_guess(price: f64, payment: f64, count: u32) -> f64 {
    let n = count as f64;
    (((payment * n / price) - 1.0) * 2.0 / (n + 1.0)).max(MIN_SEED)
}
