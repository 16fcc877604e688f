//! Summaries and tabular exports of solved plans
//!
//! Everything here reads a finished `PlanResult`; nothing recomputes a rate.

use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;

use crate::engine::PlanResult;
use crate::error::Result;
use crate::plan::SolveMode;
use crate::schedule::CashflowTable;
use crate::solver::{IterationTrace, SolverConfig};

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// One-row summary of a solved plan, as exported to CSV
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub start_date: Option<NaiveDate>,
    pub price: f64,
    pub count: u32,
    pub payment: f64,
    pub timing: String,
    pub periodicity: String,
    pub monthly_rate: f64,
    pub annual_effective_rate: f64,
    pub monthly_rate_pct: f64,
    pub annual_effective_pct: f64,
    pub annual_nominal_rate: f64,
    pub annual_nominal_pct: f64,
    pub pv_installments: f64,
    pub difference: f64,
    pub adjusted_last_payment: Option<f64>,
    pub mode: String,
    pub count_real: f64,
    pub count_rounded: u32,
    pub converged: bool,
    pub tolerance: Option<f64>,
    pub max_iterations: Option<u32>,
}

impl PlanSummary {
    /// Build the summary; solver settings are only reported for rate solves
    pub fn new(result: &PlanResult, config: &SolverConfig) -> Self {
        let rates = &result.effective_rates;
        let params = &result.parameters;
        let gap = result.equivalence_gap();
        let (tolerance, max_iterations) = match result.mode {
            SolveMode::Rate => (Some(config.tolerance), Some(config.max_iterations)),
            SolveMode::Count => (None, None),
        };

        Self {
            start_date: result.start_date,
            price: params.price,
            count: params.count,
            payment: params.payment,
            timing: params.timing.as_str().to_string(),
            periodicity: result.periodicity.as_str().to_string(),
            monthly_rate: round_to(rates.monthly_fraction, 6),
            annual_effective_rate: round_to(rates.annual_effective_fraction, 6),
            monthly_rate_pct: round_to(rates.monthly_pct(), 3),
            annual_effective_pct: round_to(rates.annual_effective_pct(), 2),
            annual_nominal_rate: round_to(rates.annual_nominal_fraction, 6),
            annual_nominal_pct: round_to(rates.annual_nominal_pct(), 2),
            pv_installments: round_to(result.table.total_present_value, 2),
            // Sub-cent gaps print as 0.00 rather than -0.00
            difference: if gap.abs() < 0.005 { 0.0 } else { round_to(gap, 2) },
            adjusted_last_payment: result.adjusted_last_payment.map(|v| round_to(v, 2)),
            mode: result.mode.as_str().to_string(),
            count_real: round_to(result.count_real, 3),
            count_rounded: params.count,
            converged: result.converged(),
            tolerance,
            max_iterations,
        }
    }

    /// Plain-text report of the plan and its implied rates
    pub fn render_text(&self) -> String {
        let mut lines = vec![
            "Plan summary".to_string(),
            format!("- Cash price (contraprestación): {:.2}", self.price),
            format!("- Installment (prestación): {:.2}", self.payment),
            format!("- Installments: {}", self.count),
            format!("- Mode: {}", self.mode),
        ];
        if let Some(date) = self.start_date {
            lines.push(format!("- Start date: {}", date.format("%d/%m/%Y")));
        }
        if self.mode == SolveMode::Count.as_str() {
            lines.push(format!("- n (real): {:.3} -> n (rounded): {}", self.count_real, self.count_rounded));
        }
        lines.push(format!("- Periodicity: {}", self.periodicity));
        lines.push(format!("- Payment timing: {}", self.timing));
        if let Some(last) = self.adjusted_last_payment {
            lines.push(format!("- Adjusted last installment: {:.2}", last));
        }

        lines.extend([
            String::new(),
            "Rate equating the installments with the cash price:".to_string(),
            format!("- Monthly rate: {:.6} ({:.3} %)", self.monthly_rate, self.monthly_rate_pct),
            format!("- Annual effective (TEA): {:.6} ({:.2} %)", self.annual_effective_rate, self.annual_effective_pct),
            format!("- Annual nominal (TNA): {:.6} ({:.2} %)", self.annual_nominal_rate, self.annual_nominal_pct),
            format!("- PV of installments: {:.2} (difference {:.2})", self.pv_installments, self.difference),
        ]);
        if !self.converged {
            lines.push("- Warning: solver did not converge; rate is a best-effort estimate".to_string());
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

/// Cashflow row as exported, with running present value
#[derive(Debug, Clone, Serialize)]
struct FlowRecord {
    period: u32,
    payment_date: Option<NaiveDate>,
    payment: f64,
    discount_factor: f64,
    present_value: f64,
    cumulative_present_value: f64,
}

/// Write one summary row per plan
pub fn write_summary_csv<W: Write>(writer: W, summaries: &[PlanSummary]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for summary in summaries {
        csv_writer.serialize(summary)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the installment schedule
pub fn write_cashflows_csv<W: Write>(writer: W, table: &CashflowTable) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for (row, cumulative) in table.rows.iter().zip(table.cumulative_present_value()) {
        csv_writer.serialize(FlowRecord {
            period: row.period,
            payment_date: row.payment_date,
            payment: row.payment_amount,
            discount_factor: row.discount_factor,
            present_value: row.present_value_contribution,
            cumulative_present_value: cumulative,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the solver iterations
pub fn write_trace_csv<W: Write>(writer: W, trace: &IterationTrace) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in trace.records() {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Closed facts handed to a narrative writer, which must not recompute them
pub fn explanation_facts(result: &PlanResult) -> String {
    let params = &result.parameters;
    let rates = &result.effective_rates;
    let scheme = if params.timing.is_advance() {
        "payment in advance"
    } else {
        "payment in arrears"
    };

    let mut lines = vec![
        "Closed figures (do not recompute):".to_string(),
        format!("- cash_price={:.2}", params.price),
        format!("- installments={} of {:.2}", params.count, params.payment),
        format!("- scheme={}", scheme),
        format!("- monthly_rate={:.6} (={:.3}%)", rates.monthly_fraction, rates.monthly_pct()),
        format!("- TEA={:.6} (={:.2}%)", rates.annual_effective_fraction, rates.annual_effective_pct()),
        format!("- TNA={:.6} (={:.2}%)", rates.annual_nominal_fraction, rates.annual_nominal_pct()),
        format!("- periodicity={}", result.periodicity),
    ];
    if let Some(date) = result.start_date {
        lines.push(format!("- start_date={}", date));
    }
    lines.push(format!("- mode={}", result.mode));
    if let Some(last) = result.adjusted_last_payment {
        lines.push(format!("- adjusted_last_installment={:.2}", last));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
