//! Calendar dates for installments
//!
//! Periodicity only labels the schedule; the rate math always works in
//! abstract periods.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::annuity::Timing;
use crate::error::EquivalenceError;

/// Spacing between installments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Periodicity {
    #[default]
    Monthly,
    Bimonthly,
    Quarterly,
    FourMonthly,
    Semiannual,
    Annual,
}

impl Periodicity {
    /// Months between consecutive installments
    pub fn months(&self) -> u32 {
        match self {
            Periodicity::Monthly => 1,
            Periodicity::Bimonthly => 2,
            Periodicity::Quarterly => 3,
            Periodicity::FourMonthly => 4,
            Periodicity::Semiannual => 6,
            Periodicity::Annual => 12,
        }
    }

    /// Label used in imported/exported scenario files
    pub fn as_str(&self) -> &'static str {
        match self {
            Periodicity::Monthly => "Mensual",
            Periodicity::Bimonthly => "Bimestral",
            Periodicity::Quarterly => "Trimestral",
            Periodicity::FourMonthly => "Cuatrimestral",
            Periodicity::Semiannual => "Semestral",
            Periodicity::Annual => "Anual",
        }
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Periodicity {
    type Err = EquivalenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mensual" | "monthly" => Ok(Periodicity::Monthly),
            "bimestral" | "bimonthly" => Ok(Periodicity::Bimonthly),
            "trimestral" | "quarterly" => Ok(Periodicity::Quarterly),
            "cuatrimestral" | "four-monthly" | "fourmonthly" => Ok(Periodicity::FourMonthly),
            "semestral" | "semiannual" | "semi-annual" => Ok(Periodicity::Semiannual),
            "anual" | "annual" | "yearly" => Ok(Periodicity::Annual),
            _ => Err(EquivalenceError::UnknownLabel {
                kind: "periodicity",
                label: s.to_string(),
            }),
        }
    }
}

/// Due dates of `count` installments starting from `start`
///
/// In-advance plans pay the first installment on `start`; arrears plans one
/// period later. Every date is offset from `start` itself, so a day clamped
/// in a short month does not carry over to later installments.
pub fn payment_dates(
    start: NaiveDate,
    periodicity: Periodicity,
    count: u32,
    timing: Timing,
) -> Vec<NaiveDate> {
    let step = periodicity.months();
    let offset = match timing {
        Timing::Advance => 0,
        Timing::Arrears => 1,
    };

    (0..count)
        .map_while(|k| start.checked_add_months(Months::new((k + offset) * step)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_arrears_starts_one_period_later() {
        let dates = payment_dates(date(2024, 1, 15), Periodicity::Quarterly, 3, Timing::Arrears);
        assert_eq!(dates, vec![date(2024, 4, 15), date(2024, 7, 15), date(2024, 10, 15)]);
    }

    #[test]
    fn test_advance_starts_on_start_date() {
        let dates = payment_dates(date(2024, 1, 15), Periodicity::Monthly, 2, Timing::Advance);
        assert_eq!(dates, vec![date(2024, 1, 15), date(2024, 2, 15)]);
    }

    #[test]
    fn test_month_end_clamps() {
        let dates = payment_dates(date(2023, 1, 31), Periodicity::Monthly, 2, Timing::Arrears);
        assert_eq!(dates, vec![date(2023, 2, 28), date(2023, 3, 31)]);
    }

    #[test]
    fn test_periodicity_labels() {
        assert_eq!("Cuatrimestral".parse::<Periodicity>().unwrap().months(), 4);
        assert_eq!("semiannual".parse::<Periodicity>().unwrap(), Periodicity::Semiannual);
        assert!("weekly".parse::<Periodicity>().is_err());
        assert_eq!(Periodicity::default().as_str(), "Mensual");
    }
}
