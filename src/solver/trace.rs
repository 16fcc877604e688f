//! Step-by-step record of a rate solve

use serde::{Deserialize, Serialize};

/// One iteration of the rate solver, tagged by the phase that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum IterationStep {
    Newton {
        iteration: u32,
        rate: f64,
        residual: f64,
        derivative: f64,
    },
    Bisect {
        iteration: u32,
        low: f64,
        high: f64,
        midpoint: f64,
        residual_at_mid: f64,
    },
}

impl IterationStep {
    /// 1-based iteration number within its own phase
    pub fn iteration(&self) -> u32 {
        match self {
            IterationStep::Newton { iteration, .. } | IterationStep::Bisect { iteration, .. } => {
                *iteration
            }
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            IterationStep::Newton { .. } => "newton",
            IterationStep::Bisect { .. } => "bisect",
        }
    }

    /// Rate evaluated at this step (the midpoint for bisection)
    pub fn rate(&self) -> f64 {
        match self {
            IterationStep::Newton { rate, .. } => *rate,
            IterationStep::Bisect { midpoint, .. } => *midpoint,
        }
    }

    /// `PV(rate) - price` at this step
    pub fn residual(&self) -> f64 {
        match self {
            IterationStep::Newton { residual, .. } => *residual,
            IterationStep::Bisect { residual_at_mid, .. } => *residual_at_mid,
        }
    }

    /// Flatten into a fixed-column record for tabular export
    pub fn to_record(&self) -> TraceRecord {
        match *self {
            IterationStep::Newton { iteration, rate, residual, derivative } => TraceRecord {
                method: "newton",
                iteration,
                rate,
                rate_pct: rate * 100.0,
                residual,
                derivative: Some(derivative),
                low: None,
                high: None,
            },
            IterationStep::Bisect { iteration, low, high, midpoint, residual_at_mid } => TraceRecord {
                method: "bisect",
                iteration,
                rate: midpoint,
                rate_pct: midpoint * 100.0,
                residual: residual_at_mid,
                derivative: None,
                low: Some(low),
                high: Some(high),
            },
        }
    }
}

/// Flat view of an `IterationStep`; phase-specific columns are left empty
#[derive(Debug, Clone, Serialize)]
pub struct TraceRecord {
    pub method: &'static str,
    pub iteration: u32,
    pub rate: f64,
    pub rate_pct: f64,
    pub residual: f64,
    pub derivative: Option<f64>,
    pub low: Option<f64>,
    pub high: Option<f64>,
}

/// Chronological sequence of solver steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IterationTrace {
    steps: Vec<IterationStep>,
}

impl IterationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, step: IterationStep) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[IterationStep] {
        &self.steps
    }

    pub fn last(&self) -> Option<&IterationStep> {
        self.steps.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IterationStep> {
        self.steps.iter()
    }

    pub fn newton_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, IterationStep::Newton { .. }))
            .count()
    }

    pub fn bisection_steps(&self) -> usize {
        self.len() - self.newton_steps()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.steps.iter().map(IterationStep::to_record).collect()
    }
}

impl IntoIterator for IterationTrace {
    type Item = IterationStep;
    type IntoIter = std::vec::IntoIter<IterationStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

impl<'a> IntoIterator for &'a IterationTrace {
    type Item = &'a IterationStep;
    type IntoIter = std::slice::Iter<'a, IterationStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_serializes_with_method_tag() {
        let step = IterationStep::Bisect {
            iteration: 3,
            low: 0.0,
            high: 1.0,
            midpoint: 0.5,
            residual_at_mid: -2.0,
        };
        let json = serde_json::to_value(step).unwrap();
        assert_eq!(json["method"], "bisect");
        assert_eq!(json["midpoint"], 0.5);

        let back: IterationStep = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_trace_keeps_insertion_order() {
        let mut trace = IterationTrace::new();
        trace.push(IterationStep::Newton { iteration: 1, rate: 0.1, residual: 5.0, derivative: -2.0 });
        trace.push(IterationStep::Newton { iteration: 2, rate: 0.09, residual: 0.1, derivative: -2.1 });
        trace.push(IterationStep::Bisect { iteration: 1, low: 0.0, high: 10.0, midpoint: 5.0, residual_at_mid: -9.0 });

        let methods: Vec<_> = trace.iter().map(|s| s.method()).collect();
        assert_eq!(methods, vec!["newton", "newton", "bisect"]);
        assert_eq!(trace.newton_steps(), 2);
        assert_eq!(trace.bisection_steps(), 1);

        let records = trace.records();
        assert_eq!(records[2].low, Some(0.0));
        assert_eq!(records[0].derivative, Some(-2.0));
        assert!(records[0].low.is_none());
    }
}
