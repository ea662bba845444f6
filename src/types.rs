//! Core data types for sacd-extract
//!
//! These types represent the domain model and flow from the planner to the engine.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Size of one logical sector on the disc, in bytes
pub const SECTOR_SIZE: usize = 2048;

// =============================================================================
// Disc areas
// =============================================================================

/// Channel-configuration program area on the disc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaKind {
    TwoChannel,
    MultiChannel,
}

impl AreaKind {
    /// Qualifier appended to names when several areas are extracted together
    pub fn qualifier(self) -> &'static str {
        match self {
            AreaKind::TwoChannel => "[stereo]",
            AreaKind::MultiChannel => "[multi]",
        }
    }
}

impl fmt::Display for AreaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AreaKind::TwoChannel => f.write_str("two-channel"),
            AreaKind::MultiChannel => f.write_str("multi-channel"),
        }
    }
}

/// Encoding of the audio frames stored in an area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameFormat {
    /// DST-compressed frames
    Compressed,
    /// Plain DSD frames
    Uncompressed,
}

/// A program area as reported by the disc structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelArea {
    pub kind: AreaKind,
    pub track_count: usize,
    pub frame_format: FrameFormat,
}

/// Per-track metadata as reported by the disc structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: Option<String>,
    pub performer: Option<String>,
    /// First logical sector of the track
    pub start_sector: u32,
    /// Length of the track in sectors
    pub sector_count: u32,
    /// Start time in SACD frames (75 per second), relative to the area start
    pub start_frames: u32,
    /// Duration in SACD frames
    pub duration_frames: u32,
}

// =============================================================================
// Output formats and jobs
// =============================================================================

/// Format produced by a track transcode job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackFormat {
    /// Sony DSF, one file per track
    Dsf,
    /// Philips DSDIFF, one file per track
    Dsdiff,
    /// Philips DSDIFF, one continuous file per area
    DsdiffEditMaster,
}

impl TrackFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TrackFormat::Dsf => "dsf",
            TrackFormat::Dsdiff | TrackFormat::DsdiffEditMaster => "dff",
        }
    }

    /// Label used in status lines ("DSF output: ...")
    pub fn label(self) -> &'static str {
        match self {
            TrackFormat::Dsf => "DSF",
            TrackFormat::Dsdiff | TrackFormat::DsdiffEditMaster => "DSDIFF",
        }
    }
}

impl fmt::Display for TrackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackFormat::Dsf => f.write_str("dsf"),
            TrackFormat::Dsdiff => f.write_str("dsdiff"),
            TrackFormat::DsdiffEditMaster => f.write_str("dsdiff_edit_master"),
        }
    }
}

/// Independently progressing execution context inside the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineId {
    /// Raw image jobs, and every job when concurrency is off
    Main,
    /// Track jobs running alongside the raw image in concurrent mode
    DecodedTrack,
}

/// A single track transcode, as handed to the output engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackJob {
    pub area: AreaKind,
    pub track_index: usize,
    pub path: PathBuf,
    pub format: TrackFormat,
    /// Engine must emit plain DSD (decoding DST frames where present)
    pub decode_required: bool,
    pub pad_required: bool,
    pub pipeline_id: PipelineId,
}

/// One unit of work produced by the planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionJob {
    RawSectorRange {
        offset: u32,
        length: u32,
        path: PathBuf,
    },
    TrackTranscode(TrackJob),
    CueExport {
        area: AreaKind,
        path: PathBuf,
        /// Edit master the sheet refers to, when one is planned in the same run
        #[serde(skip_serializing_if = "Option::is_none")]
        audio: Option<PathBuf>,
    },
}

impl ExtractionJob {
    pub fn path(&self) -> &std::path::Path {
        match self {
            ExtractionJob::RawSectorRange { path, .. } => path,
            ExtractionJob::TrackTranscode(job) => &job.path,
            ExtractionJob::CueExport { path, .. } => path,
        }
    }

    /// Pipeline the job is routed to; cue exports run on the control thread
    pub fn pipeline_id(&self) -> PipelineId {
        match self {
            ExtractionJob::TrackTranscode(job) => job.pipeline_id,
            _ => PipelineId::Main,
        }
    }
}
