//! Validated extraction options
//!
//! Built once from the CLI and passed by reference to every component.
//! All flag precedence is resolved here into an `OutputMode`, so the planner
//! only ever sees valid combinations.

use super::cli::Cli;
use crate::error::{ExtractError, Result};
use crate::selection::TrackSelectionSet;
use crate::types::TrackFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Mutually exclusive output combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Raw image only
    ImageOnly,
    /// One file per selected track
    Tracks(TrackFormat),
    /// Raw image plus per-track files, optionally in two concurrent pipelines
    ImageAndTracks { format: TrackFormat, concurrent: bool },
    /// One DSDIFF file per area; always paired with a CUE sheet
    EditMaster,
}

/// Runtime options for one extraction run
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    /// Source image
    pub input: PathBuf,
    /// What to produce; `None` for cue-only or print-only runs
    pub mode: Option<OutputMode>,
    /// Write a CUE sheet per area
    pub export_cue: bool,
    pub two_channel: bool,
    pub multi_channel: bool,
    /// Explicit track subset; empty means all tracks
    pub tracks: TrackSelectionSet,
    /// Zero pad DSF output
    pub pad: bool,
    /// Decode DST to plain DSD for DSDIFF output
    pub convert_dst: bool,
    /// Album name override
    pub album_name: Option<String>,
    /// Directory for images, CUE sheets and edit masters
    pub output_dir: PathBuf,
    /// Parent directory for per-track album folders
    pub track_output_dir: PathBuf,
    /// Print disc information
    pub print: bool,
    /// Plan without extracting
    pub dry_run: bool,
    /// Emit the dry-run plan as JSON
    pub json: bool,
}

impl ExtractionOptions {
    /// Validate CLI arguments into options
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let track_format = match (cli.output_dsf, cli.output_dsdiff) {
            (true, true) => {
                return Err(ExtractError::config(
                    "--output-dsf and --output-dsdiff cannot be used together",
                ))
            }
            (true, false) => Some(TrackFormat::Dsf),
            (false, true) => Some(TrackFormat::Dsdiff),
            (false, false) => None,
        };

        let mode = if cli.output_dsdiff_em {
            if cli.output_iso || track_format.is_some() {
                warn!("Edit master output disables raw image and per-track output for this run");
            }
            Some(OutputMode::EditMaster)
        } else {
            match (cli.output_iso, track_format) {
                (true, Some(format)) => Some(OutputMode::ImageAndTracks {
                    format,
                    concurrent: cli.concurrent,
                }),
                (true, None) => Some(OutputMode::ImageOnly),
                (false, Some(format)) => Some(OutputMode::Tracks(format)),
                (false, None) => None,
            }
        };

        let concurrent = matches!(mode, Some(OutputMode::ImageAndTracks { concurrent: true, .. }));
        if cli.concurrent && !concurrent {
            debug!("Concurrent mode needs both ISO and track output, ignoring --concurrent");
        }

        let export_cue = cli.export_cue || mode == Some(OutputMode::EditMaster);

        // default to two channel
        let (two_channel, multi_channel) = if !cli.two_channel && !cli.multi_channel {
            (true, false)
        } else {
            (cli.two_channel, cli.multi_channel)
        };

        let output_dir = match &cli.output_dir {
            Some(dir) => {
                require_directory(dir)?;
                dir.clone()
            }
            None => PathBuf::from("."),
        };

        let track_output_dir = match &cli.output_dir_conc {
            Some(dir) if concurrent => {
                require_directory(dir)?;
                dir.clone()
            }
            Some(_) => {
                debug!("--output-dir-conc only applies to concurrent mode, ignoring");
                output_dir.clone()
            }
            None => output_dir.clone(),
        };

        let tracks = cli
            .select_tracks
            .as_deref()
            .map(TrackSelectionSet::parse)
            .unwrap_or_default();

        Ok(Self {
            input: cli.input.clone(),
            mode,
            export_cue,
            two_channel,
            multi_channel,
            tracks,
            pad: !cli.dsf_nopad,
            convert_dst: cli.convert_dst,
            album_name: cli.album_name.clone(),
            output_dir,
            track_output_dir,
            print: cli.print,
            dry_run: cli.dry_run,
            json: cli.json,
        })
    }

    /// True when anything besides printing was requested
    pub fn has_work(&self) -> bool {
        self.mode.is_some() || self.export_cue
    }

    pub fn wants_image(&self) -> bool {
        matches!(
            self.mode,
            Some(OutputMode::ImageOnly) | Some(OutputMode::ImageAndTracks { .. })
        )
    }

    /// Per-track format, if per-track output was requested
    pub fn track_format(&self) -> Option<TrackFormat> {
        match self.mode {
            Some(OutputMode::Tracks(format)) | Some(OutputMode::ImageAndTracks { format, .. }) => {
                Some(format)
            }
            _ => None,
        }
    }

    pub fn is_concurrent(&self) -> bool {
        matches!(self.mode, Some(OutputMode::ImageAndTracks { concurrent: true, .. }))
    }
}

fn require_directory(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(ExtractError::config(format!(
            "{} doesn't exist or is not a directory",
            dir.display()
        )))
    }
}
