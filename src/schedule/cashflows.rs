//! Per-period payment table with discount factors and present values

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::annuity::Timing;

/// A single installment of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowRow {
    /// 1-based installment number
    pub period: u32,

    /// Calendar date of the installment, when a start date is known
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payment_date: Option<NaiveDate>,

    pub payment_amount: f64,
    pub discount_factor: f64,
    pub present_value_contribution: f64,
}

/// Installment rows plus the sum of their present values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowTable {
    pub rows: Vec<CashflowRow>,
    pub total_present_value: f64,
}

/// Expand a plan into per-period rows discounted at `rate`
///
/// In-advance installments are discounted one period less than arrears
/// ones, since the first falls due at time zero.
pub fn cashflow_table(payment: f64, count: u32, timing: Timing, rate: f64) -> CashflowTable {
    let rows: Vec<CashflowRow> = (1..=count)
        .map(|period| {
            let exponent = match timing {
                Timing::Advance => period - 1,
                Timing::Arrears => period,
            };
            let discount_factor = (1.0 + rate).powf(-(exponent as f64));
            CashflowRow {
                period,
                payment_date: None,
                payment_amount: payment,
                discount_factor,
                present_value_contribution: payment * discount_factor,
            }
        })
        .collect();

    let total_present_value = rows.iter().map(|r| r.present_value_contribution).sum();
    CashflowTable {
        rows,
        total_present_value,
    }
}

impl CashflowTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `total_present_value - price`; zero when the plan is equivalent to the price
    pub fn equivalence_gap(&self, price: f64) -> f64 {
        self.total_present_value - price
    }

    /// Rewrite the last installment so the table's present value equals `price`
    ///
    /// Returns the new last payment, or `None` for an empty table.
    pub fn adjust_last_payment(&mut self, price: f64) -> Option<f64> {
        let (last, earlier) = self.rows.split_last_mut()?;
        let pv_earlier: f64 = earlier.iter().map(|r| r.present_value_contribution).sum();

        let adjusted = (price - pv_earlier) / last.discount_factor;
        last.payment_amount = adjusted;
        last.present_value_contribution = adjusted * last.discount_factor;

        self.total_present_value = self.rows.iter().map(|r| r.present_value_contribution).sum();
        Some(adjusted)
    }

    /// Attach calendar dates to the rows, in order
    pub fn set_payment_dates(&mut self, dates: &[NaiveDate]) {
        for (row, date) in self.rows.iter_mut().zip(dates) {
            row.payment_date = Some(*date);
        }
    }

    /// Running total of present values, one entry per row
    pub fn cumulative_present_value(&self) -> Vec<f64> {
        self.rows
            .iter()
            .scan(0.0, |acc, r| {
                *acc += r.present_value_contribution;
                Some(*acc)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annuity::present_value;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_total_matches_closed_form() {
        for timing in [Timing::Arrears, Timing::Advance] {
            let table = cashflow_table(14_315.22, 12, timing, 0.03);
            assert_eq!(table.len(), 12);
            let closed = present_value(14_315.22, 0.03, 12, timing);
            assert_abs_diff_eq!(table.total_present_value, closed, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_discount_exponents() {
        let arrears = cashflow_table(100.0, 3, Timing::Arrears, 0.10);
        let advance = cashflow_table(100.0, 3, Timing::Advance, 0.10);

        assert_abs_diff_eq!(arrears.rows[0].discount_factor, 1.0 / 1.1, epsilon = 1e-12);
        assert_eq!(advance.rows[0].discount_factor, 1.0);
        assert_abs_diff_eq!(advance.rows[2].discount_factor, 1.0 / 1.21, epsilon = 1e-12);
        assert_eq!(arrears.rows[2].period, 3);
    }

    #[test]
    fn test_tabulation_is_idempotent() {
        let first = cashflow_table(812.5, 36, Timing::Advance, 0.021);
        let second = cashflow_table(812.5, 36, Timing::Advance, 0.021);
        assert_eq!(first, second);
    }

    #[test]
    fn test_adjust_last_payment_closes_gap() {
        // 13 payments of 10,000 overshoot 100,000 at 3%
        let mut table = cashflow_table(10_000.0, 13, Timing::Arrears, 0.03);
        assert!(table.equivalence_gap(100_000.0) > 0.0);

        let last = table.adjust_last_payment(100_000.0).unwrap();
        assert!(last > 0.0 && last < 10_000.0);
        assert_abs_diff_eq!(table.equivalence_gap(100_000.0), 0.0, epsilon = 1e-6);
        assert_eq!(table.rows[12].payment_amount, last);
        assert_eq!(table.rows[11].payment_amount, 10_000.0);
    }

    #[test]
    fn test_adjust_empty_table() {
        let mut table = cashflow_table(100.0, 0, Timing::Arrears, 0.01);
        assert!(table.is_empty());
        assert_eq!(table.adjust_last_payment(50.0), None);
    }

    #[test]
    fn test_cumulative_present_value() {
        let table = cashflow_table(100.0, 4, Timing::Advance, 0.0);
        assert_eq!(table.cumulative_present_value(), vec![100.0, 200.0, 300.0, 400.0]);
    }
}
