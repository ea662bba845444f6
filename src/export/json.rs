//! JSON export of an extraction plan (dry-run mode)

use crate::error::{ExtractError, Result};
use crate::types::{ChannelArea, ExtractionJob};
use serde::Serialize;
use std::io::Write;

/// JSON output schema version
const SCHEMA_VERSION: &str = "1.0";

/// Top-level JSON output structure
#[derive(Debug, Serialize)]
pub struct PlanJson<'a> {
    /// Schema version for forward compatibility
    pub version: &'static str,
    pub metadata: PlanMetadata<'a>,
    /// Jobs in execution order
    pub jobs: &'a [ExtractionJob],
}

/// Plan metadata
#[derive(Debug, Serialize)]
pub struct PlanMetadata<'a> {
    /// sacd-extract version that generated the plan
    pub generator_version: &'static str,
    /// Timestamp of planning
    pub planned_at: String,
    pub album: &'a str,
    pub total_sectors: u32,
    pub areas: &'a [ChannelArea],
    pub job_count: usize,
}

/// Write a plan as pretty-printed JSON
pub fn write_plan_json<W: Write>(
    out: W,
    album: &str,
    total_sectors: u32,
    areas: &[ChannelArea],
    jobs: &[ExtractionJob],
) -> Result<()> {
    let output = PlanJson {
        version: SCHEMA_VERSION,
        metadata: PlanMetadata {
            generator_version: env!("CARGO_PKG_VERSION"),
            planned_at: chrono::Utc::now().to_rfc3339(),
            album,
            total_sectors,
            areas,
            job_count: jobs.len(),
        },
        jobs,
    };

    serde_json::to_writer_pretty(out, &output)
        .map_err(|e| ExtractError::Io(std::io::Error::other(e)))
}
