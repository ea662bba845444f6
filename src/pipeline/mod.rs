//! Extraction pipeline: planning and supervised execution

pub mod orchestrator;
pub mod planner;

pub use orchestrator::{execute_plan, run, run_with, PipelineResult, RunOutcome};
pub use planner::{plan, Plan, PlanRequest, VOLUME_SECTOR_LIMIT};
