//! Present value of a level annuity, paid in arrears or in advance

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EquivalenceError;

/// Payment timing within each period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Timing {
    /// Payment at the end of the period (vencido)
    #[default]
    Arrears,
    /// Payment at the start of the period (adelantado)
    Advance,
}

impl Timing {
    pub fn is_advance(&self) -> bool {
        matches!(self, Timing::Advance)
    }

    /// Build from the in-advance flag used by the solver signatures
    pub fn from_advance(advance: bool) -> Self {
        if advance {
            Timing::Advance
        } else {
            Timing::Arrears
        }
    }

    /// Label matching the exported reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Timing::Arrears => "Vencido (fin de período)",
            Timing::Advance => "Adelantado (inicio de período)",
        }
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timing {
    type Err = EquivalenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_lowercase();
        if label.starts_with("adel") || label.starts_with("advance") || label == "due" {
            Ok(Timing::Advance)
        } else if label.starts_with("venc") || label.starts_with("arrear") || label == "ordinary" {
            Ok(Timing::Arrears)
        } else {
            Err(EquivalenceError::UnknownLabel {
                kind: "timing",
                label: s.to_string(),
            })
        }
    }
}

/// Present value of `count` level payments at periodic `rate`
///
/// A zero rate degenerates to the undiscounted sum. In-advance timing
/// shifts every payment one period earlier, i.e. multiplies by `(1 + rate)`.
///
/// `rate` must be greater than -1; nothing here guards against it and the
/// power term goes non-finite below that bound.
pub fn present_value(payment: f64, rate: f64, count: u32, timing: Timing) -> f64 {
    let arrears = if rate == 0.0 {
        payment * count as f64
    } else {
        payment * (1.0 - (1.0 + rate).powf(-(count as f64))) / rate
    };

    match timing {
        Timing::Arrears => arrears,
        Timing::Advance => arrears * (1.0 + rate),
    }
}

/// Residual `PV(rate) - price` that the rate solver drives to zero
pub(crate) fn residual(price: f64, payment: f64, rate: f64, count: u32, timing: Timing) -> f64 {
    present_value(payment, rate, count, timing) - price
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_rate_is_undiscounted_sum() {
        for timing in [Timing::Arrears, Timing::Advance] {
            assert_eq!(present_value(250.0, 0.0, 12, timing), 3000.0);
        }
    }

    #[test]
    fn test_arrears_annuity_factor() {
        // a(12, 3%) = 9.954004
        let pv = present_value(1.0, 0.03, 12, Timing::Arrears);
        assert_relative_eq!(pv, 9.954003994, epsilon = 1e-8);
    }

    #[test]
    fn test_advance_is_arrears_times_one_plus_rate() {
        let arrears = present_value(1000.0, 0.02, 24, Timing::Arrears);
        let advance = present_value(1000.0, 0.02, 24, Timing::Advance);
        assert_relative_eq!(advance, arrears * 1.02, epsilon = 1e-9);
    }

    #[test]
    fn test_single_payment() {
        assert_relative_eq!(present_value(110.0, 0.10, 1, Timing::Arrears), 100.0, epsilon = 1e-9);
        assert_relative_eq!(present_value(110.0, 0.10, 1, Timing::Advance), 110.0, epsilon = 1e-9);
    }

    #[test]
    fn test_strictly_decreasing_in_rate() {
        let mut prev = present_value(100.0, 1e-6, 36, Timing::Arrears);
        for step in 1..200 {
            let rate = step as f64 * 0.005;
            let pv = present_value(100.0, rate, 36, Timing::Arrears);
            assert!(pv < prev, "PV not decreasing at rate {}", rate);
            prev = pv;
        }
    }

    #[test]
    fn test_timing_labels() {
        assert_eq!("Adelantado (inicio de período)".parse::<Timing>().unwrap(), Timing::Advance);
        assert_eq!("Vencido (fin de período)".parse::<Timing>().unwrap(), Timing::Arrears);
        assert_eq!("advance".parse::<Timing>().unwrap(), Timing::Advance);
        assert!("monthly".parse::<Timing>().is_err());
        assert_eq!(Timing::from_advance(true), Timing::Advance);
    }
}
