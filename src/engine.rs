//! Equivalence engine: turns a validated plan request into a solved plan
//!
//! Holds only its solver configuration; every solve is independent of the
//! ones before it.

use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};

use crate::annuity::EffectiveRates;
use crate::error::Result;
use crate::plan::{AnnuityParameters, PlanRequest, SolveMode};
use crate::schedule::{cashflow_table, payment_dates, CashflowTable, Periodicity};
use crate::solver::{solve_count, solve_rate, RateSolution, SolverConfig};

/// Largest |PV(installments) - price| reported as an equivalence
pub const EQUIVALENCE_THRESHOLD: f64 = 0.50;

/// A solved plan: the rate, the installment schedule and how it was found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub mode: SolveMode,

    /// Price, payment, whole installment count and timing of the solved plan
    pub parameters: AnnuityParameters,

    pub periodicity: Periodicity,
    pub start_date: Option<NaiveDate>,

    /// Periodic rate: solved in rate mode, as given in count mode
    pub rate: f64,

    pub effective_rates: EffectiveRates,

    /// Count before rounding up (equals the count in rate mode)
    pub count_real: f64,

    /// Rate-solver outcome; `None` in count mode
    pub solution: Option<RateSolution>,

    pub table: CashflowTable,

    /// Replacement last installment, when the schedule was adjusted
    pub adjusted_last_payment: Option<f64>,
}

impl PlanResult {
    /// `PV(installments) - price`
    pub fn equivalence_gap(&self) -> f64 {
        self.table.equivalence_gap(self.parameters.price)
    }

    pub fn is_equivalent(&self) -> bool {
        self.equivalence_gap().abs() <= EQUIVALENCE_THRESHOLD
    }

    /// False only when a rate solve exhausted both phases
    pub fn converged(&self) -> bool {
        self.solution.as_ref().map(|s| s.converged).unwrap_or(true)
    }
}

/// Stateless solver front-end
#[derive(Debug, Clone, Copy, Default)]
pub struct EquivalenceEngine {
    config: SolverConfig,
}

impl EquivalenceEngine {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Rate solve on already-validated parameters
    pub fn solve_parameters(&self, params: &AnnuityParameters) -> RateSolution {
        solve_rate(params.price, params.payment, params.count, params.timing, &self.config)
    }

    /// Validate and solve a request in whichever mode it asks for
    pub fn solve(&self, request: &PlanRequest) -> Result<PlanResult> {
        request.validate()?;

        let result = match request.mode {
            SolveMode::Rate => self.solve_for_rate(request),
            SolveMode::Count => self.solve_for_count(request)?,
        };

        info!(
            "Solved {:?} plan: rate {:.6}, {} installments, gap {:.2}",
            result.mode,
            result.rate,
            result.parameters.count,
            result.equivalence_gap()
        );
        Ok(result)
    }

    fn solve_for_rate(&self, request: &PlanRequest) -> PlanResult {
        // validate() guarantees the count in rate mode
        let count = request.count.unwrap_or(1);
        let parameters = request.parameters(count);
        let solution = self.solve_parameters(&parameters);
        let rate = solution.rate;

        let table = self.tabulate(request, &parameters, rate);

        PlanResult {
            mode: SolveMode::Rate,
            parameters,
            periodicity: request.periodicity,
            start_date: request.start_date,
            rate,
            effective_rates: EffectiveRates::from_periodic(rate),
            count_real: count as f64,
            solution: Some(solution),
            table,
            adjusted_last_payment: None,
        }
    }

    fn solve_for_count(&self, request: &PlanRequest) -> Result<PlanResult> {
        let rate = request.periodic_rate.unwrap_or_default();
        let count = solve_count(request.price, request.payment, rate, request.timing)?;
        let parameters = request.parameters(count.rounded);

        let mut table = self.tabulate(request, &parameters, rate);
        let adjusted_last_payment = if request.adjust_last_payment {
            table.adjust_last_payment(request.price)
        } else {
            None
        };

        Ok(PlanResult {
            mode: SolveMode::Count,
            parameters,
            periodicity: request.periodicity,
            start_date: request.start_date,
            rate,
            effective_rates: EffectiveRates::from_periodic(rate),
            count_real: count.real,
            solution: None,
            table,
            adjusted_last_payment,
        })
    }

    fn tabulate(&self, request: &PlanRequest, parameters: &AnnuityParameters, rate: f64) -> CashflowTable {
        let mut table = cashflow_table(parameters.payment, parameters.count, parameters.timing, rate);
        if let Some(start) = request.start_date {
            let dates = payment_dates(start, request.periodicity, parameters.count, parameters.timing);
            table.set_payment_dates(&dates);
        }
        table
    }
}
