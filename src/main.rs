//! Annuity Equivalence CLI
//!
//! Solve for the implicit rate or the installment count of a level plan,
//! print the result, and optionally export summary, flow and iteration tables.

use anyhow::{bail, Context, Result};
use annuity_equivalence::{
    plan::{load_request, scenario_to_json},
    report::{explanation_facts, write_cashflows_csv, write_summary_csv, write_trace_csv},
    EquivalenceEngine, Periodicity, PlanRequest, PlanResult, PlanSummary, SolveMode, SolverConfig,
    Timing,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "annuity_equivalence", version, about = "Implicit rate / installment count of a level annuity")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    options: Options,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve for the periodic rate (price, payment, count)
    Rate {
        #[arg(long)]
        price: f64,
        #[arg(long)]
        payment: f64,
        #[arg(long)]
        count: u32,
        /// Payments at the start of each period
        #[arg(long)]
        advance: bool,
    },
    /// Solve for the number of installments (price, payment, rate)
    Count {
        #[arg(long)]
        price: f64,
        #[arg(long)]
        payment: f64,
        /// Periodic rate as a fraction (0.03 = 3%)
        #[arg(long)]
        rate: f64,
        #[arg(long)]
        advance: bool,
        /// Keep the last installment unchanged
        #[arg(long)]
        no_adjust: bool,
    },
    /// Solve a scenario from a JSON file or the first row of a CSV table
    Import { path: PathBuf },
    /// Solve the reference plan: 12 installments of 14,315.22 against 100,000
    Example,
}

#[derive(Args, Debug)]
struct Options {
    /// Newton convergence tolerance
    #[arg(long, global = true, default_value_t = 1e-12)]
    tolerance: f64,

    /// Maximum Newton iterations
    #[arg(long, global = true, default_value_t = 80)]
    max_iter: u32,

    /// Installment spacing (Mensual, Bimestral, Trimestral, Cuatrimestral, Semestral, Anual)
    #[arg(long, global = true)]
    periodicity: Option<Periodicity>,

    /// First date of the plan (YYYY-MM-DD)
    #[arg(long, global = true)]
    start_date: Option<NaiveDate>,

    /// Print the installment schedule
    #[arg(long, global = true)]
    show_flow: bool,

    /// Print the solver iterations
    #[arg(long, global = true)]
    show_iterations: bool,

    /// Print the closed figures handed to a narrative writer
    #[arg(long, global = true)]
    explain: bool,

    /// Print the full result as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    summary_csv: Option<PathBuf>,

    #[arg(long, global = true)]
    flow_csv: Option<PathBuf>,

    #[arg(long, global = true)]
    iterations_csv: Option<PathBuf>,

    /// Write the scenario (with the solved rate) as JSON
    #[arg(long, global = true)]
    export_json: Option<PathBuf>,
}

fn build_request(command: Command, options: &Options) -> Result<PlanRequest> {
    let mut request = match command {
        Command::Rate { price, payment, count, advance } => {
            PlanRequest::for_rate(price, payment, count, Timing::from_advance(advance))
        }
        Command::Count { price, payment, rate, advance, no_adjust } => {
            PlanRequest::for_count(price, payment, rate, Timing::from_advance(advance))
                .with_last_payment_adjustment(!no_adjust)
        }
        Command::Import { path } => load_request(&path)
            .with_context(|| format!("Failed to import scenario from {}", path.display()))?,
        Command::Example => PlanRequest::for_rate(100_000.0, 14_315.22, 12, Timing::Arrears),
    };

    if let Some(periodicity) = options.periodicity {
        request.periodicity = periodicity;
    }
    if let Some(start) = options.start_date {
        request.start_date = Some(start);
    }
    Ok(request)
}

fn print_flow(result: &PlanResult) {
    println!("\n{:>6} {:>12} {:>14} {:>12} {:>14} {:>14}",
        "Period", "Date", "Payment", "Factor", "PV", "Cum PV");
    println!("{}", "-".repeat(78));

    let cumulative = result.table.cumulative_present_value();
    for (row, cum) in result.table.rows.iter().zip(cumulative) {
        let date = row.payment_date.map(|d| d.to_string()).unwrap_or_default();
        println!("{:>6} {:>12} {:>14.2} {:>12.8} {:>14.2} {:>14.2}",
            row.period, date, row.payment_amount, row.discount_factor,
            row.present_value_contribution, cum);
    }
    println!("Check: PV(installments) = {:.2} vs cash price {:.2}",
        result.table.total_present_value, result.parameters.price);
}

fn print_iterations(result: &PlanResult) {
    let Some(trace) = result.solution.as_ref().and_then(|s| s.trace.as_ref()) else {
        println!("\n(no iterations recorded)");
        return;
    };

    println!("\n{:>7} {:>5} {:>16} {:>10} {:>16}", "Method", "Iter", "Rate", "Rate %", "Residual");
    println!("{}", "-".repeat(60));
    for step in trace {
        println!("{:>7} {:>5} {:>16.12} {:>10.6} {:>16.6e}",
            step.method(), step.iteration(), step.rate(), step.rate() * 100.0, step.residual());
    }
}

fn create(path: &PathBuf) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Unable to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let options = cli.options;

    let wants_trace = options.show_iterations || options.iterations_csv.is_some();
    let config = SolverConfig::default()
        .with_tolerance(options.tolerance)
        .with_max_iterations(options.max_iter)
        .with_trace(wants_trace);

    let request = build_request(cli.command, &options)?;
    let engine = EquivalenceEngine::new(config);
    let result = engine.solve(&request).context("Unable to solve the plan")?;
    let summary = PlanSummary::new(&result, &config);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", summary.render_text());
        if result.is_equivalent() {
            println!("\nFinancial equivalence verified (difference ~ 0).");
        } else {
            println!("\nDifference is not ~0; review the inputs or raise the iteration limit.");
        }
        if options.show_flow {
            print_flow(&result);
        }
        if options.show_iterations && result.mode == SolveMode::Rate {
            print_iterations(&result);
        }
        if options.explain {
            println!("\n{}", explanation_facts(&result));
        }
    }

    if let Some(path) = &options.summary_csv {
        write_summary_csv(create(path)?, std::slice::from_ref(&summary))?;
        println!("Summary written to: {}", path.display());
    }
    if let Some(path) = &options.flow_csv {
        write_cashflows_csv(create(path)?, &result.table)?;
        println!("Installment schedule written to: {}", path.display());
    }
    if let Some(path) = &options.iterations_csv {
        match result.solution.as_ref().and_then(|s| s.trace.as_ref()) {
            Some(trace) => {
                write_trace_csv(create(path)?, trace)?;
                println!("Iterations written to: {}", path.display());
            }
            None => bail!("Iterations are only available when solving for the rate"),
        }
    }
    if let Some(path) = &options.export_json {
        let solved_rate = result.solution.as_ref().map(|s| s.rate);
        std::fs::write(path, scenario_to_json(&request, solved_rate)?)
            .with_context(|| format!("Unable to write {}", path.display()))?;
        println!("Scenario written to: {}", path.display());
    }

    Ok(())
}
