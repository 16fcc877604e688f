//! Solve every plan in a CSV table and write one summary row per plan
//!
//! Usage: solve_batch <input.csv> [output.csv]
//!
//! Solver settings come from EQUIV_TOLERANCE and EQUIV_MAX_ITER.

use annuity_equivalence::{
    plan::load_requests,
    report::write_summary_csv,
    PlanSummary, ScenarioRunner, SolverConfig,
};
use anyhow::{Context, Result};
use log::warn;
use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::time::Instant;

fn config_from_env() -> Result<SolverConfig> {
    let mut config = SolverConfig::default();
    if let Ok(raw) = env::var("EQUIV_TOLERANCE") {
        config.tolerance = raw
            .parse()
            .with_context(|| format!("EQUIV_TOLERANCE is not a number: {}", raw))?;
    }
    if let Ok(raw) = env::var("EQUIV_MAX_ITER") {
        config.max_iterations = raw
            .parse()
            .with_context(|| format!("EQUIV_MAX_ITER is not an integer: {}", raw))?;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let input = args.next().context("Usage: solve_batch <input.csv> [output.csv]")?;
    let output = args.next().unwrap_or_else(|| "batch_summary.csv".to_string());

    let start = Instant::now();
    println!("Loading plans from {}...", input);
    let requests = load_requests(&input).with_context(|| format!("Failed to load {}", input))?;
    println!("Loaded {} plans in {:?}", requests.len(), start.elapsed());

    let config = config_from_env()?;
    let runner = ScenarioRunner::new(config);

    println!("Solving...");
    let solve_start = Instant::now();
    let results = runner.run_batch(&requests);
    println!("Solved in {:?}", solve_start.elapsed());

    let mut summaries = Vec::with_capacity(results.len());
    let mut failures = 0usize;
    for (row, result) in results.iter().enumerate() {
        match result {
            Ok(result) => summaries.push(PlanSummary::new(result, runner.config())),
            Err(e) => {
                failures += 1;
                warn!("Row {} skipped: {}", row + 1, e);
            }
        }
    }

    let file = File::create(&output).with_context(|| format!("Unable to create {}", output))?;
    write_summary_csv(BufWriter::new(file), &summaries)?;
    println!("Output written to {}", output);

    println!("\nBatch Summary:");
    println!("  Plans solved:      {}", summaries.len());
    println!("  Plans rejected:    {}", failures);
    println!("  Not converged:     {}", summaries.iter().filter(|s| !s.converged).count());
    if let Some(max_gap) = summaries.iter().map(|s| s.difference.abs()).reduce(f64::max) {
        println!("  Largest |gap|:     {:.2}", max_gap);
    }
    println!("\nTotal time: {:?}", start.elapsed());
    Ok(())
}
