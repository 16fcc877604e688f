//! Annualised rates derived from a monthly periodic rate

use serde::{Deserialize, Serialize};

/// Periods per year assumed by the annual conversions
pub const PERIODS_PER_YEAR: i32 = 12;

/// Annual effective rate (TEA): `(1 + rate)^12 - 1`
pub fn annual_effective(rate: f64) -> f64 {
    (1.0 + rate).powi(PERIODS_PER_YEAR) - 1.0
}

/// Annual nominal rate (TNA): `rate * 12`, no compounding
pub fn annual_nominal(rate: f64) -> f64 {
    rate * PERIODS_PER_YEAR as f64
}

/// Monthly, effective annual and nominal annual rates as fractions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveRates {
    pub monthly_fraction: f64,
    pub annual_effective_fraction: f64,
    pub annual_nominal_fraction: f64,
}

impl EffectiveRates {
    pub fn from_periodic(rate: f64) -> Self {
        Self {
            monthly_fraction: rate,
            annual_effective_fraction: annual_effective(rate),
            annual_nominal_fraction: annual_nominal(rate),
        }
    }

    pub fn monthly_pct(&self) -> f64 {
        self.monthly_fraction * 100.0
    }

    pub fn annual_effective_pct(&self) -> f64 {
        self.annual_effective_fraction * 100.0
    }

    pub fn annual_nominal_pct(&self) -> f64 {
        self.annual_nominal_fraction * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_three_percent_monthly() {
        let rates = EffectiveRates::from_periodic(0.03);
        assert_abs_diff_eq!(rates.annual_effective_fraction, 0.4258, epsilon = 1e-3);
        assert_abs_diff_eq!(rates.annual_nominal_fraction, 0.36, epsilon = 1e-12);
        assert_abs_diff_eq!(rates.monthly_pct(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_rate() {
        let rates = EffectiveRates::from_periodic(0.0);
        assert_eq!(rates.annual_effective_fraction, 0.0);
        assert_eq!(rates.annual_nominal_fraction, 0.0);
    }
}
