//! Number of installments needed to repay a price at a known rate

use log::debug;
use serde::{Deserialize, Serialize};

use crate::annuity::Timing;
use crate::error::{EquivalenceError, Result};

/// Distance from an integer under which a real count is treated as that integer
const INTEGER_SNAP: f64 = 1e-9;

/// Largest installment count accepted anywhere in a plan (100 years of monthly payments)
pub const MAX_INSTALLMENTS: u32 = 1_200;

/// Installment count, exact and rounded up to whole payments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstallmentCount {
    /// Real-valued count from the closed-form inverse
    pub real: f64,
    /// Smallest whole number of payments covering the price
    pub rounded: u32,
}

/// Closed-form inverse of the arrears annuity formula
///
/// In-advance prices are first brought back one period so the same formula
/// applies. Returns `InvalidInputs` when any input is non-positive, when
/// the payment does not cover a period's interest (`rate * price / payment >= 1`)
/// or when more than `MAX_INSTALLMENTS` payments would be needed.
pub fn solve_count(price: f64, payment: f64, rate: f64, timing: Timing) -> Result<InstallmentCount> {
    if !(price.is_finite() && payment.is_finite() && rate.is_finite()) {
        return Err(EquivalenceError::invalid("price, payment and rate must be finite"));
    }
    if price <= 0.0 || payment <= 0.0 || rate <= 0.0 {
        return Err(EquivalenceError::invalid(
            "price, payment and periodic rate must be positive",
        ));
    }

    let price_equiv = match timing {
        Timing::Arrears => price,
        Timing::Advance => price / (1.0 + rate),
    };
    let x = rate * price_equiv / payment;

    if !(x > 0.0 && x < 1.0) {
        return Err(EquivalenceError::invalid(format!(
            "payment does not cover the period's interest (i*PV/PMT = {:.6})",
            x
        )));
    }

    let real = -(1.0 - x).ln() / (1.0 + rate).ln();
    let nearest = real.round();
    let whole = if (real - nearest).abs() < INTEGER_SNAP {
        nearest
    } else {
        real.ceil()
    };

    if whole > MAX_INSTALLMENTS as f64 {
        return Err(EquivalenceError::invalid(format!(
            "installment count {:.0} exceeds the limit of {}",
            whole, MAX_INSTALLMENTS
        )));
    }

    debug!("Installment count: real {:.6} -> {}", real, whole);
    Ok(InstallmentCount {
        real,
        rounded: (whole as u32).max(1),
    })
}
