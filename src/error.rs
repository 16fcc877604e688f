//! Error types for plan validation, import/export, and the scenario store

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, EquivalenceError>;

/// Errors surfaced by the equivalence engine and its collaborators
///
/// The rate solver never produces one of these: it always returns a
/// best-effort rate and reports convergence through `RateSolution`.
#[derive(Debug, Error)]
pub enum EquivalenceError {
    /// Inputs outside the domain of the requested computation
    #[error("Invalid inputs: {0}")]
    InvalidInputs(String),

    /// An imported table lacks the columns needed for either solve mode
    #[error("Missing columns: {0}")]
    MissingColumns(String),

    /// A label (timing, periodicity, mode) could not be recognised
    #[error("Unknown {kind} label: {label}")]
    UnknownLabel { kind: &'static str, label: String },

    /// Scenario names must contain something other than whitespace
    #[error("Scenario name is empty")]
    EmptyScenarioName,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date error: {0}")]
    Date(#[from] chrono::ParseError),
}

impl EquivalenceError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        EquivalenceError::InvalidInputs(reason.into())
    }
}
