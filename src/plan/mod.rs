//! Plan requests and scenario import/export

mod data;
pub mod loader;

pub use data::{AnnuityParameters, PlanRequest, SolveMode};
pub use loader::{
    load_first_request, load_request, load_request_json, load_requests,
    load_requests_from_reader, request_from_json_str, scenario_to_json, ScenarioFile,
};
