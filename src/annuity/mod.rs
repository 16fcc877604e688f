//! Annuity valuation, seed heuristic, and rate conversions

mod valuation;
mod seed;
mod rates;

pub use valuation::{present_value, Timing};
pub(crate) use valuation::residual;
pub use seed::{initial_guess, MIN_SEED};
pub use rates::{annual_effective, annual_nominal, EffectiveRates, PERIODS_PER_YEAR};
