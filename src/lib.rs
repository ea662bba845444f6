//! sacd-extract - Super Audio CD image extraction
//!
//! Reads a Scarletbook disc image and produces a raw image copy (optionally
//! split into volumes), per-track DSF/DSDIFF files, DSDIFF edit masters and
//! CUE sheets.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `config`: CLI argument parsing and validated options
//! - `disc`: Sector access and table-of-contents probing
//! - `selection`: Track and area selection
//! - `naming`: Collision-free output paths
//! - `pipeline`: Job planning and supervised execution
//! - `engine`: Output engine running the planned jobs
//! - `progress`: Console progress reporting
//! - `interrupt`: Cooperative Ctrl-C handling
//! - `export`: CUE sheet and JSON plan output
//!
//! # Example
//!
//! ```no_run
//! use clap::Parser;
//! use sacd_extract::config::{Cli, ExtractionOptions};
//! use sacd_extract::interrupt::InterruptController;
//! use sacd_extract::pipeline;
//! use std::sync::Arc;
//!
//! let cli = Cli::parse_from(["sacd-extract", "-i", "disc.iso", "-I"]);
//! let options = ExtractionOptions::from_cli(&cli).expect("invalid options");
//! let interrupt = Arc::new(InterruptController::new());
//! let result = pipeline::run(&options, &interrupt).expect("Extraction failed");
//! println!("Wrote {} files", result.completed);
//! ```

pub mod config;
pub mod disc;
pub mod engine;
pub mod error;
pub mod export;
pub mod interrupt;
pub mod naming;
pub mod pipeline;
pub mod progress;
pub mod selection;
pub mod types;

// Re-export key types at crate root
pub use error::{ExtractError, Result};
pub use types::{AreaKind, ChannelArea, ExtractionJob, PipelineId, TrackFormat, TrackJob};
