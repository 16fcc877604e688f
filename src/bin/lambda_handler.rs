//! AWS Lambda handler for single-plan solves
//!
//! Accepts a scenario in the JSON import layout (plus optional solver
//! settings) and returns the summary, the installment schedule, the solver
//! iterations and the closed facts for a narrative writer.

use annuity_equivalence::{
    plan::ScenarioFile,
    report::explanation_facts,
    solver::TraceRecord,
    CashflowRow, EquivalenceEngine, PlanSummary, SolverConfig,
};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};

/// Scenario fields plus solver overrides
#[derive(Debug, Deserialize)]
pub struct SolveRequest {
    #[serde(flatten)]
    pub scenario: ScenarioFile,

    /// Newton tolerance (default: 1e-12)
    #[serde(default)]
    pub tolerance: Option<f64>,

    /// Newton iteration limit (default: 80)
    #[serde(default)]
    pub max_iterations: Option<u32>,

    /// Return the solver iterations
    #[serde(default)]
    pub trace: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct SolveResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PlanSummary>,
    pub cashflows: Vec<CashflowRow>,
    pub iterations: Vec<TraceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facts: Option<String>,
    pub execution_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn config_for(request: &SolveRequest) -> SolverConfig {
    let defaults = SolverConfig::default();
    SolverConfig::default()
        .with_tolerance(request.tolerance.unwrap_or(defaults.tolerance))
        .with_max_iterations(request.max_iterations.unwrap_or(defaults.max_iterations))
        .with_trace(request.trace)
}

fn solve(request: SolveRequest) -> SolveResponse {
    let config = config_for(&request);
    let plan = match request.scenario.into_request() {
        Ok(plan) => plan,
        Err(e) => {
            return SolveResponse {
                error: Some(format!("Invalid scenario: {}", e)),
                ..Default::default()
            }
        }
    };

    match EquivalenceEngine::new(config).solve(&plan) {
        Ok(result) => SolveResponse {
            summary: Some(PlanSummary::new(&result, &config)),
            iterations: result
                .solution
                .as_ref()
                .and_then(|s| s.trace.as_ref())
                .map(|t| t.records())
                .unwrap_or_default(),
            facts: Some(explanation_facts(&result)),
            cashflows: result.table.rows,
            ..Default::default()
        },
        Err(e) => SolveResponse {
            error: Some(e.to_string()),
            ..Default::default()
        },
    }
}

/// Lambda handler function
async fn handler(event: LambdaEvent<SolveRequest>) -> Result<SolveResponse, Error> {
    let start = std::time::Instant::now();
    let mut response = solve(event.payload);
    response.execution_time_ms = start.elapsed().as_millis() as u64;
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    run(service_fn(handler)).await
}
