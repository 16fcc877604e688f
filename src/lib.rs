//! Annuity Equivalence - implicit rate and installment-count engine
//!
//! Finds the periodic rate that makes a stream of level installments
//! (prestación) equivalent to a cash price (contraprestación), or the number
//! of installments needed at a known rate. Supports payments in arrears
//! (vencido) and in advance (adelantado).
//!
//! This library provides:
//! - Closed-form annuity valuation and a Baily-type seed
//! - Hybrid Newton-Raphson / bisection rate solver with optional step trace
//! - Closed-form installment-count solver with last-payment adjustment
//! - Effective/nominal annual rates and discounted cashflow tables
//! - Scenario import/export (JSON, CSV), summaries and an in-memory scenario store

pub mod error;
pub mod annuity;
pub mod solver;
pub mod schedule;
pub mod plan;
pub mod engine;
pub mod report;
pub mod scenario;

// Re-export commonly used types
pub use error::{EquivalenceError, Result};
pub use annuity::{present_value, initial_guess, annual_effective, EffectiveRates, Timing};
pub use solver::{solve_rate, solve_count, RateSolution, SolverConfig, IterationStep, InstallmentCount, MAX_INSTALLMENTS};
pub use schedule::{cashflow_table, CashflowRow, CashflowTable, Periodicity};
pub use plan::{AnnuityParameters, PlanRequest, SolveMode};
pub use engine::{EquivalenceEngine, PlanResult};
pub use report::PlanSummary;
pub use scenario::{ScenarioRunner, ScenarioStore};
