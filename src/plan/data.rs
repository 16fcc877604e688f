//! Installment plan inputs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::annuity::Timing;
use crate::error::{EquivalenceError, Result};
use crate::schedule::Periodicity;
use crate::solver::MAX_INSTALLMENTS;

fn default_true() -> bool {
    true
}

/// The four numbers a rate solve works on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnuityParameters {
    /// Cash price the installments must be equivalent to
    pub price: f64,
    /// Level installment amount
    pub payment: f64,
    /// Number of installments
    pub count: u32,
    pub timing: Timing,
}

impl AnnuityParameters {
    pub fn new(price: f64, payment: f64, count: u32, timing: Timing) -> Self {
        Self {
            price,
            payment,
            count,
            timing,
        }
    }

    /// Undiscounted sum of the installments
    pub fn total_payments(&self) -> f64 {
        self.payment * self.count as f64
    }
}

/// What the caller wants solved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SolveMode {
    /// Implicit periodic rate from price, payment and count
    #[default]
    Rate,
    /// Installment count from price, payment and a known rate
    Count,
}

impl SolveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolveMode::Rate => "Calcular tasa (i)",
            SolveMode::Count => "Calcular cuotas (n)",
        }
    }
}

impl fmt::Display for SolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SolveMode {
    type Err = EquivalenceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let label = s.trim().to_lowercase();
        if label.contains("cuotas") || label.contains("(n)") || label == "count" || label == "n" {
            Ok(SolveMode::Count)
        } else if label.contains("tasa") || label.contains("(i)") || label == "rate" || label == "i" {
            Ok(SolveMode::Rate)
        } else {
            Err(EquivalenceError::UnknownLabel {
                kind: "mode",
                label: s.to_string(),
            })
        }
    }
}

/// A solve request as supplied by a form, file import, or API call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub price: f64,
    pub payment: f64,

    /// Required when solving for the rate
    #[serde(default)]
    pub count: Option<u32>,

    /// Required when solving for the count
    #[serde(default)]
    pub periodic_rate: Option<f64>,

    #[serde(default)]
    pub timing: Timing,

    #[serde(default)]
    pub mode: SolveMode,

    #[serde(default)]
    pub periodicity: Periodicity,

    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    /// Count mode only: rewrite the last installment for exact equivalence
    #[serde(default = "default_true")]
    pub adjust_last_payment: bool,
}

impl PlanRequest {
    /// Request the implicit rate of `count` payments against `price`
    pub fn for_rate(price: f64, payment: f64, count: u32, timing: Timing) -> Self {
        Self {
            price,
            payment,
            count: Some(count),
            periodic_rate: None,
            timing,
            mode: SolveMode::Rate,
            periodicity: Periodicity::default(),
            start_date: None,
            adjust_last_payment: true,
        }
    }

    /// Request the installment count that repays `price` at `rate`
    pub fn for_count(price: f64, payment: f64, rate: f64, timing: Timing) -> Self {
        Self {
            price,
            payment,
            count: None,
            periodic_rate: Some(rate),
            timing,
            mode: SolveMode::Count,
            periodicity: Periodicity::default(),
            start_date: None,
            adjust_last_payment: true,
        }
    }

    pub fn with_periodicity(mut self, periodicity: Periodicity) -> Self {
        self.periodicity = periodicity;
        self
    }

    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn with_last_payment_adjustment(mut self, adjust: bool) -> Self {
        self.adjust_last_payment = adjust;
        self
    }

    /// Positivity and completeness checks the solvers leave to their callers
    pub fn validate(&self) -> Result<()> {
        if !(self.price.is_finite() && self.price > 0.0) {
            return Err(EquivalenceError::invalid("price must be a positive number"));
        }
        if !(self.payment.is_finite() && self.payment > 0.0) {
            return Err(EquivalenceError::invalid("payment must be a positive number"));
        }

        match self.mode {
            SolveMode::Rate => match self.count {
                Some(n) if (1..=MAX_INSTALLMENTS).contains(&n) => Ok(()),
                Some(0) => Err(EquivalenceError::invalid("installment count must be at least 1")),
                Some(n) => Err(EquivalenceError::invalid(format!(
                    "installment count {} exceeds the limit of {}",
                    n, MAX_INSTALLMENTS
                ))),
                None => Err(EquivalenceError::invalid("installment count is required to solve for the rate")),
            },
            SolveMode::Count => match self.periodic_rate {
                Some(rate) if rate.is_finite() && rate > 0.0 => Ok(()),
                Some(_) => Err(EquivalenceError::invalid("periodic rate must be positive")),
                None => Err(EquivalenceError::invalid("periodic rate is required to solve for the count")),
            },
        }
    }

    /// Parameters for the core solvers once the count is known
    pub fn parameters(&self, count: u32) -> AnnuityParameters {
        AnnuityParameters::new(self.price, self.payment, count, self.timing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rate_request() {
        assert!(PlanRequest::for_rate(100_000.0, 14_315.22, 12, Timing::Arrears).validate().is_ok());
        assert!(PlanRequest::for_rate(0.0, 14_315.22, 12, Timing::Arrears).validate().is_err());
        assert!(PlanRequest::for_rate(100_000.0, -1.0, 12, Timing::Arrears).validate().is_err());
        assert!(PlanRequest::for_rate(100_000.0, 14_315.22, 0, Timing::Arrears).validate().is_err());
        assert!(PlanRequest::for_rate(100_000.0, 100.0, MAX_INSTALLMENTS, Timing::Arrears).validate().is_ok());
        assert!(PlanRequest::for_rate(100_000.0, 100.0, MAX_INSTALLMENTS + 1, Timing::Arrears).validate().is_err());
        assert!(PlanRequest::for_rate(100_000.0, 100.0, u32::MAX, Timing::Arrears).validate().is_err());

        let mut missing = PlanRequest::for_rate(100_000.0, 14_315.22, 12, Timing::Arrears);
        missing.count = None;
        assert!(matches!(missing.validate(), Err(EquivalenceError::InvalidInputs(_))));
    }

    #[test]
    fn test_validate_count_request() {
        assert!(PlanRequest::for_count(100_000.0, 10_000.0, 0.03, Timing::Advance).validate().is_ok());
        assert!(PlanRequest::for_count(100_000.0, 10_000.0, 0.0, Timing::Advance).validate().is_err());
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!("Calcular cuotas (n)".parse::<SolveMode>().unwrap(), SolveMode::Count);
        assert_eq!("Calcular tasa (i)".parse::<SolveMode>().unwrap(), SolveMode::Rate);
        assert_eq!("rate".parse::<SolveMode>().unwrap(), SolveMode::Rate);
        assert!("amortise".parse::<SolveMode>().is_err());
    }

    #[test]
    fn test_request_json_defaults() {
        let request: PlanRequest =
            serde_json::from_str(r#"{"price": 1000.0, "payment": 100.0, "count": 12}"#).unwrap();
        assert_eq!(request.mode, SolveMode::Rate);
        assert_eq!(request.timing, Timing::Arrears);
        assert_eq!(request.periodicity, Periodicity::Monthly);
        assert!(request.adjust_last_payment);
    }
}
