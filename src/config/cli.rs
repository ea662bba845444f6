//! CLI argument parsing and configuration

use clap::Parser;
use std::path::PathBuf;

/// sacd-extract - Super Audio CD image extraction
///
/// Extracts a raw ISO image, per-track DSF/DSDIFF files, a DSDIFF edit
/// master or CUE sheets from a Super Audio CD image.
#[derive(Parser, Debug, Default)]
#[command(name = "sacd-extract")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Export two channel tracks (default)
    #[arg(short = '2', long = "2ch-tracks")]
    pub two_channel: bool,

    /// Export multi-channel tracks
    #[arg(short = 'm', long = "mch-tracks")]
    pub multi_channel: bool,

    /// Output as Philips DSDIFF (Edit Master) file
    #[arg(short = 'e', long = "output-dsdiff-em")]
    pub output_dsdiff_em: bool,

    /// Output as Philips DSDIFF file
    #[arg(short = 'p', long = "output-dsdiff", conflicts_with = "output_dsf")]
    pub output_dsdiff: bool,

    /// Output as Sony DSF file
    #[arg(short = 's', long = "output-dsf")]
    pub output_dsf: bool,

    /// Do not zero pad DSF (has no effect with -t)
    #[arg(short = 'z', long = "dsf-nopad")]
    pub dsf_nopad: bool,

    /// Only output selected track(s) (ex. -t 1,5,13)
    #[arg(short = 't', long = "select-track", value_name = "TRACKS")]
    pub select_tracks: Option<String>,

    /// Output as raw ISO
    #[arg(short = 'I', long = "output-iso")]
    pub output_iso: bool,

    /// Concurrent ISO+DSF/DSDIFF processing mode
    #[arg(short = 'w', long)]
    pub concurrent: bool,

    /// Convert DST to DSD
    #[arg(short = 'c', long = "convert-dst")]
    pub convert_dst: bool,

    /// Export a CUE sheet
    #[arg(short = 'C', long = "export-cue")]
    pub export_cue: bool,

    /// Source image
    #[arg(short, long, value_name = "FILE", env = "SACD_EXTRACT_INPUT")]
    pub input: PathBuf,

    /// Output directory (ISO output dir for concurrent processing mode)
    #[arg(short, long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// DSF/DSDIFF output directory for concurrent processing mode
    #[arg(short = 'y', long = "output-dir-conc", value_name = "DIR")]
    pub output_dir_conc: Option<PathBuf>,

    /// Display disc and track information
    #[arg(short = 'P', long)]
    pub print: bool,

    /// Show the planned jobs without extracting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the dry-run plan as JSON
    #[arg(long, requires = "dry_run")]
    pub json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors are logged)
    #[arg(short, long)]
    pub quiet: bool,

    /// Album name to use instead of the one derived from the disc
    #[arg(value_name = "OUTFILE")]
    pub album_name: Option<String>,
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
