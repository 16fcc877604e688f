//! Root solvers: implicit rate and installment count

mod trace;
mod rate;
mod count;

pub use trace::{IterationStep, IterationTrace, TraceRecord};
pub use rate::{
    solve_rate, RateSolution, SolveMethod, SolverConfig, BISECTION_BRACKET,
    BISECTION_MAX_ITERATIONS, BISECTION_RESIDUAL_TOLERANCE,
};
pub use count::{solve_count, InstallmentCount, MAX_INSTALLMENTS};
