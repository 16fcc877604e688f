//! Named scenarios kept in memory, and batch solving
//!
//! The store only remembers what callers hand it. Solves never read from it:
//! a loaded scenario is re-solved explicitly by passing its request back in.

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::engine::{EquivalenceEngine, PlanResult};
use crate::error::{EquivalenceError, Result};
use crate::plan::{scenario_to_json, PlanRequest};
use crate::solver::SolverConfig;

/// A saved request together with its last result, if it was solved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedScenario {
    pub request: PlanRequest,
    pub result: Option<PlanResult>,
}

/// In-memory scenario cache keyed by name
#[derive(Debug, Clone, Default)]
pub struct ScenarioStore {
    scenarios: BTreeMap<String, SavedScenario>,
}

impl ScenarioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save (or overwrite) a scenario under a trimmed, non-blank name
    pub fn save(&mut self, name: &str, request: PlanRequest, result: Option<PlanResult>) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EquivalenceError::EmptyScenarioName);
        }
        debug!("Saving scenario {:?}", name);
        self.scenarios
            .insert(name.to_string(), SavedScenario { request, result });
        Ok(())
    }

    pub fn load(&self, name: &str) -> Option<&SavedScenario> {
        self.scenarios.get(name.trim())
    }

    pub fn remove(&mut self, name: &str) -> Option<SavedScenario> {
        self.scenarios.remove(name.trim())
    }

    /// Scenario names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.scenarios.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SavedScenario)> {
        self.scenarios.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Scenario JSON for a saved entry, including its solved rate when known
    pub fn export_json(&self, name: &str) -> Option<Result<String>> {
        self.load(name).map(|saved| {
            let solved_rate = saved
                .result
                .as_ref()
                .and_then(|r| r.solution.as_ref())
                .map(|s| s.rate);
            scenario_to_json(&saved.request, solved_rate)
        })
    }
}

/// Solves many requests with one solver configuration
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::new(SolverConfig::default());
/// let results = runner.run_batch(&requests);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioRunner {
    engine: EquivalenceEngine,
}

impl ScenarioRunner {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            engine: EquivalenceEngine::new(config),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        self.engine.config()
    }

    pub fn run(&self, request: &PlanRequest) -> Result<PlanResult> {
        self.engine.solve(request)
    }

    /// Solve every request in parallel; results keep the input order
    pub fn run_batch(&self, requests: &[PlanRequest]) -> Vec<Result<PlanResult>> {
        requests.par_iter().map(|r| self.engine.solve(r)).collect()
    }

    /// Solve a request and store it under `name`
    pub fn run_and_save(&self, store: &mut ScenarioStore, name: &str, request: PlanRequest) -> Result<PlanResult> {
        let result = self.engine.solve(&request)?;
        store.save(name, request, Some(result.clone()))?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annuity::Timing;

    #[test]
    fn test_store_save_load_list() {
        let mut store = ScenarioStore::new();
        let base = PlanRequest::for_rate(100_000.0, 14_315.22, 12, Timing::Arrears);
        let alt = PlanRequest::for_count(100_000.0, 10_000.0, 0.03, Timing::Advance);

        store.save("  Base case 12x14.315 ", base.clone(), None).unwrap();
        store.save("Alternative", alt, None).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.names(), vec!["Alternative", "Base case 12x14.315"]);
        assert_eq!(store.load("Base case 12x14.315").unwrap().request, base);
        assert!(store.load("missing").is_none());

        assert!(store.remove("Alternative").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut store = ScenarioStore::new();
        let request = PlanRequest::for_rate(1_000.0, 100.0, 12, Timing::Arrears);
        assert!(matches!(
            store.save("   ", request, None),
            Err(EquivalenceError::EmptyScenarioName)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_run_and_save_then_export() {
        let runner = ScenarioRunner::default();
        let mut store = ScenarioStore::new();
        let request = PlanRequest::for_rate(100_000.0, 14_315.22, 12, Timing::Arrears);

        let result = runner.run_and_save(&mut store, "base", request).unwrap();
        let json = store.export_json("base").unwrap().unwrap();
        assert!(json.contains("tasa_periodo_calculada"));
        assert_eq!(store.load("base").unwrap().result.as_ref(), Some(&result));
        assert!(store.export_json("other").is_none());
    }

    #[test]
    fn test_batch_keeps_order_and_errors() {
        let runner = ScenarioRunner::new(SolverConfig::default());
        let requests = vec![
            PlanRequest::for_rate(100_000.0, 14_315.22, 12, Timing::Arrears),
            PlanRequest::for_count(100_000.0, 1_000.0, 0.02, Timing::Arrears),
            PlanRequest::for_rate(100_000.0, 14_315.22, 12, Timing::Advance),
        ];

        let results = runner.run_batch(&requests);
        assert_eq!(results.len(), 3);
        assert!(results[1].is_err());

        let arrears = results[0].as_ref().unwrap();
        let advance = results[2].as_ref().unwrap();
        assert_eq!(arrears.parameters.timing, Timing::Arrears);
        assert!(advance.rate > arrears.rate);
    }
}
