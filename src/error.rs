//! Unified error types for sacd-extract
//!
//! Error strategy:
//! - Per-job errors (encoder missing, output file write): Recoverable, report and continue the queue
//! - Configuration and device errors: Fatal, abort before any job runs
//!
//! User interruption is not an error; see `pipeline::RunOutcome`.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for sacd-extract operations
#[derive(Debug, Error)]
pub enum ExtractError {
    // =========================================================================
    // Recoverable errors - report the job, continue with the next one
    // =========================================================================
    #[error("Failed to write '{path}': {reason}")]
    JobFailed { path: PathBuf, reason: String },

    #[error("No encoder available for {format} output\n  Tip: Use -I/--output-iso to extract a raw image instead")]
    EncoderUnavailable { format: String },

    #[error("Track {track} is not present in the {area} area")]
    TrackNotFound { area: String, track: usize },

    // =========================================================================
    // Fatal errors - abort the run
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cannot open source '{path}': {reason}\n  Tip: Check that the image file exists and is readable")]
    Device { path: PathBuf, reason: String },

    #[error("Source read failed at sector {lsn}: {reason}")]
    SectorRead { lsn: u32, reason: String },

    #[error("Not a Super Audio CD image: {0}")]
    InvalidDisc(String),

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    Output { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for sacd-extract operations
pub type Result<T> = std::result::Result<T, ExtractError>;

impl ExtractError {
    /// Returns true if the remaining job queue should be abandoned
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ExtractError::JobFailed { .. }
                | ExtractError::EncoderUnavailable { .. }
                | ExtractError::TrackNotFound { .. }
        )
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        ExtractError::Config(reason.into())
    }

    /// Create a device error for a source that could not be opened
    pub fn device(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::NotFound => "No such file or device".to_string(),
            std::io::ErrorKind::PermissionDenied => "Permission denied".to_string(),
            _ => err.to_string(),
        };
        ExtractError::Device { path, reason }
    }

    /// Create a per-job error for a failed output write
    pub fn job_failed(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        ExtractError::JobFailed {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!("Directory does not exist: {}", path.parent().map(|p| p.display().to_string()).unwrap_or_default())
            }
            std::io::ErrorKind::AlreadyExists => {
                format!("File already exists: {}", path.display())
            }
            _ => err.to_string(),
        };
        ExtractError::Output { path, reason }
    }
}
