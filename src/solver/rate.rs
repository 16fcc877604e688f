//! Implicit periodic rate of a level annuity
//!
//! Newton-Raphson seeded by the Baily-type heuristic, with a bracketed
//! bisection fallback. The solver never fails: when neither phase meets its
//! tolerance the last bisection midpoint is returned with `converged == false`.

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::trace::{IterationStep, IterationTrace};
use crate::annuity::{initial_guess, residual, Timing, MIN_SEED};

/// Bracket searched by the bisection phase (0% to 1000% per period)
pub const BISECTION_BRACKET: (f64, f64) = (1e-12, 10.0);

/// Hard cap on bisection steps
pub const BISECTION_MAX_ITERATIONS: u32 = 200;

/// Absolute residual accepted by the bisection phase
pub const BISECTION_RESIDUAL_TOLERANCE: f64 = 1e-10;

/// Configuration for a rate solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Newton stops once successive iterates differ by less than this
    pub tolerance: f64,

    /// Maximum Newton steps before falling back to bisection
    pub max_iterations: u32,

    /// Record every step in `RateSolution::trace`
    pub trace: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 80,
            trace: false,
        }
    }
}

impl SolverConfig {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

/// Phase that produced the returned rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveMethod {
    Newton,
    Bisection,
}

/// Outcome of a rate solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSolution {
    /// Periodic rate as a fraction
    pub rate: f64,

    pub method: SolveMethod,

    /// False when bisection exhausted its budget without meeting its tolerance
    pub converged: bool,

    /// Total steps taken across both phases
    pub iterations: u32,

    /// Present only when tracing was requested
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trace: Option<IterationTrace>,
}

/// Derivative used by the Newton phase for both timings
///
/// Exact for arrears; for in-advance payments the `(1 + rate)` factor is
/// not differentiated, which only slows convergence.
fn newton_derivative(payment: f64, rate: f64, count: u32) -> f64 {
    let n = count as f64;
    let a = (1.0 + rate).powf(-n);
    payment * ((rate * n * a) / (1.0 + rate) + (a - 1.0)) / (rate * rate)
}

/// Find the periodic rate at which `count` payments of `payment` are worth `price`
///
/// Inputs are expected to be validated by the caller (positive price and
/// payment, `count >= 1`).
pub fn solve_rate(
    price: f64,
    payment: f64,
    count: u32,
    timing: Timing,
    config: &SolverConfig,
) -> RateSolution {
    let mut steps = if config.trace { Some(IterationTrace::new()) } else { None };

    let (newton_rate, newton_iterations) = newton(price, payment, count, timing, config, &mut steps);
    if let Some(rate) = newton_rate {
        return RateSolution {
            rate,
            method: SolveMethod::Newton,
            converged: true,
            iterations: newton_iterations,
            trace: steps,
        };
    }

    let (rate, bisect_iterations, converged) = bisect(price, payment, count, timing, &mut steps);

    RateSolution {
        rate,
        method: SolveMethod::Bisection,
        converged,
        iterations: newton_iterations + bisect_iterations,
        trace: steps,
    }
}

/// Newton-Raphson phase; a `None` rate means fall through to bisection
fn newton(
    price: f64,
    payment: f64,
    count: u32,
    timing: Timing,
    config: &SolverConfig,
    steps: &mut Option<IterationTrace>,
) -> (Option<f64>, u32) {
    let mut rate = initial_guess(price, payment, count);
    debug!("Newton phase: seed {:.10}, tolerance {:e}", rate, config.tolerance);

    for iteration in 1..=config.max_iterations {
        if rate <= 0.0 {
            rate = MIN_SEED;
        }

        let f = residual(price, payment, rate, count, timing);
        let df = newton_derivative(payment, rate, count);
        trace!("newton {:>3}: rate={:.12} f={:.6e} df={:.6e}", iteration, rate, f, df);

        if let Some(t) = steps.as_mut() {
            t.push(IterationStep::Newton {
                iteration,
                rate,
                residual: f,
                derivative: df,
            });
        }

        if df == 0.0 {
            debug!("Newton derivative vanished at rate {:.10}, switching to bisection", rate);
            return (None, iteration);
        }

        let next = rate - f / df;
        if !next.is_finite() {
            debug!("Newton produced a non-finite iterate, switching to bisection");
            return (None, iteration);
        }

        if (next - rate).abs() < config.tolerance {
            debug!("Newton converged in {} iterations: {:.12}", iteration, next);
            return (Some(next), iteration);
        }

        rate = next;
    }

    debug!("Newton did not converge in {} iterations, switching to bisection", config.max_iterations);
    (None, config.max_iterations)
}

/// Bisection phase over `BISECTION_BRACKET`; returns (rate, iterations, converged)
fn bisect(
    price: f64,
    payment: f64,
    count: u32,
    timing: Timing,
    steps: &mut Option<IterationTrace>,
) -> (f64, u32, bool) {
    let (mut low, mut high) = BISECTION_BRACKET;
    let mut mid = (low + high) / 2.0;

    for iteration in 1..=BISECTION_MAX_ITERATIONS {
        mid = (low + high) / 2.0;
        let f_mid = residual(price, payment, mid, count, timing);

        if let Some(t) = steps.as_mut() {
            t.push(IterationStep::Bisect {
                iteration,
                low,
                high,
                midpoint: mid,
                residual_at_mid: f_mid,
            });
        }

        if f_mid.abs() < BISECTION_RESIDUAL_TOLERANCE {
            debug!("Bisection converged in {} iterations: {:.12}", iteration, mid);
            return (mid, iteration, true);
        }

        let f_low = residual(price, payment, low, count, timing);
        if f_low * f_mid <= 0.0 {
            high = mid;
        } else {
            low = mid;
        }
    }

    warn!(
        "Rate solve did not converge (price={}, payment={}, count={}); returning midpoint {:.10}",
        price, payment, count, mid
    );
    (mid, BISECTION_MAX_ITERATIONS, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annuity::{annual_effective, present_value};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_round_trip_both_timings() {
        let config = SolverConfig::default();
        for timing in [Timing::Arrears, Timing::Advance] {
            for &rate in &[0.005, 0.02, 0.03, 0.1] {
                for &count in &[6u32, 12, 60] {
                    let payment = 500.0;
                    let price = present_value(payment, rate, count, timing);
                    let solved = solve_rate(price, payment, count, timing, &config);
                    assert_abs_diff_eq!(solved.rate, rate, epsilon = 1e-9);
                    assert!(solved.converged);
                }
            }
        }
    }

    #[test]
    fn test_reference_plan_arrears() {
        // 12 monthly payments of 14,315.22 against a cash price of 100,000
        let solved = solve_rate(100_000.0, 14_315.22, 12, Timing::Arrears, &SolverConfig::default());
        assert_eq!(solved.method, SolveMethod::Newton);
        assert_abs_diff_eq!(solved.rate, 0.094950, epsilon = 1e-4);
        assert_abs_diff_eq!(annual_effective(solved.rate), 1.96983, epsilon = 1e-3);

        let pv = present_value(14_315.22, solved.rate, 12, Timing::Arrears);
        assert_abs_diff_eq!(pv, 100_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_three_percent_plan() {
        let solved = solve_rate(100_000.0, 10_046.21, 12, Timing::Arrears, &SolverConfig::default());
        assert_abs_diff_eq!(solved.rate, 0.03, epsilon = 1e-4);
        assert_abs_diff_eq!(annual_effective(solved.rate), 0.4258, epsilon = 1e-3);
    }

    #[test]
    fn test_advance_timing_changes_implied_rate() {
        // Paying each installment a period earlier makes the plan worth more at
        // any given rate, so matching the same price takes a higher rate
        let config = SolverConfig::default();
        let arrears = solve_rate(100_000.0, 14_315.22, 12, Timing::Arrears, &config);
        let advance = solve_rate(100_000.0, 14_315.22, 12, Timing::Advance, &config);
        assert!(advance.rate > arrears.rate);
        assert_abs_diff_eq!(advance.rate, 0.118167, epsilon = 1e-4);

        let pv = present_value(14_315.22, advance.rate, 12, Timing::Advance);
        assert_abs_diff_eq!(pv, 100_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_trace_ends_with_converging_step() {
        let config = SolverConfig::default().with_trace(true);
        let solved = solve_rate(100_000.0, 14_315.22, 12, Timing::Arrears, &config);
        let trace = solved.trace.expect("trace requested");

        assert_eq!(trace.len() as u32, solved.iterations);
        assert_eq!(trace.bisection_steps(), 0);
        let last = trace.last().unwrap();
        assert_eq!(last.method(), "newton");
        assert_eq!(last.iteration(), solved.iterations);
        // The recorded rate is the one the final step started from
        assert_abs_diff_eq!(last.rate(), solved.rate, epsilon = 1e-9);
    }

    #[test]
    fn test_no_trace_unless_requested() {
        let solved = solve_rate(100_000.0, 14_315.22, 12, Timing::Arrears, &SolverConfig::default());
        assert!(solved.trace.is_none());
    }

    #[test]
    fn test_bisection_only_path() {
        // A zero Newton budget leaves the bracketed bisection to do all the work
        let config = SolverConfig::default().with_max_iterations(0).with_trace(true);
        let price = present_value(250.0, 0.015, 1, Timing::Arrears);
        let solved = solve_rate(price, 250.0, 1, Timing::Arrears, &config);

        assert_eq!(solved.method, SolveMethod::Bisection);
        assert_abs_diff_eq!(solved.rate, 0.015, epsilon = 1e-9);
        let pv = present_value(250.0, solved.rate, 1, Timing::Arrears);
        assert_abs_diff_eq!(pv, price, epsilon = 1e-8);

        let trace = solved.trace.unwrap();
        assert_eq!(trace.newton_steps(), 0);
        match trace.steps()[0] {
            IterationStep::Bisect { low, high, .. } => {
                assert_eq!((low, high), BISECTION_BRACKET);
            }
            other => panic!("expected bisection step, got {:?}", other),
        }
    }

    #[test]
    fn test_vanishing_derivative_falls_back_to_bisection() {
        // A subnormal payment underflows the derivative to exactly zero at the seed
        let config = SolverConfig::default().with_trace(true);
        let solved = solve_rate(1e-320, 5e-324, 1, Timing::Arrears, &config);

        assert_eq!(solved.method, SolveMethod::Bisection);
        assert!(solved.converged);

        let trace = solved.trace.unwrap();
        assert_eq!(trace.newton_steps(), 1);
        match trace.steps()[0] {
            IterationStep::Newton { derivative, rate, .. } => {
                assert_eq!(derivative, 0.0);
                assert_eq!(rate, MIN_SEED);
            }
            other => panic!("expected newton step, got {:?}", other),
        }
        assert!(matches!(trace.steps()[1], IterationStep::Bisect { .. }));

        let f = residual(1e-320, 5e-324, solved.rate, 1, Timing::Arrears);
        assert!(f.abs() < BISECTION_RESIDUAL_TOLERANCE);
    }

    #[test]
    fn test_bracket_contains_sign_change() {
        let (low, high) = BISECTION_BRACKET;
        let price = 1_000.0;
        for &payment in &[100.0, 200.0, 500.0] {
            for &count in &[3u32, 12, 60] {
                if payment * count as f64 <= price {
                    continue;
                }
                let f_low = residual(price, payment, low, count, Timing::Arrears);
                let f_high = residual(price, payment, high, count, Timing::Arrears);
                assert!(f_low > 0.0 && f_high < 0.0, "no sign change for {} x {}", count, payment);
            }
        }
    }

    #[test]
    fn test_degenerate_inputs_do_not_panic() {
        // Payments sum to less than the price: no positive root exists
        let config = SolverConfig::default().with_trace(true);
        let solved = solve_rate(10_000.0, 100.0, 12, Timing::Arrears, &config);

        assert_eq!(solved.method, SolveMethod::Bisection);
        assert!(!solved.converged);
        assert!(solved.rate > BISECTION_BRACKET.0 && solved.rate <= BISECTION_BRACKET.1);
        assert_eq!(solved.trace.unwrap().bisection_steps() as u32, BISECTION_MAX_ITERATIONS);
    }

    #[test]
    fn test_newton_derivative_matches_arrears_slope() {
        let (payment, rate, count) = (100.0, 0.02, 24);
        let h = 1e-6;
        let numeric = (present_value(payment, rate + h, count, Timing::Arrears)
            - present_value(payment, rate - h, count, Timing::Arrears))
            / (2.0 * h);
        assert_abs_diff_eq!(newton_derivative(payment, rate, count), numeric, epsilon = 1e-4);
    }
}
