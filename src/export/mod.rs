//! Export modules for CUE sheets and JSON plans

pub mod cue;
pub mod json;

pub use cue::write_cue_sheet;
pub use json::write_plan_json;
