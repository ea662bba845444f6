//! Output engine
//!
//! The orchestrator hands planned jobs to an `OutputEngine` and blocks in
//! `start` until they finish or are interrupted. `PipelineEngine` copies raw
//! sector ranges itself and hands track jobs to a `TrackEncoder` registered
//! for the job's format.

pub mod worker;

pub use worker::PipelineEngine;

use crate::disc::SectorReader;
use crate::error::Result;
use crate::progress::ProgressSink;
use crate::types::{TrackFormat, TrackInfo, TrackJob};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Executes extraction jobs
pub trait OutputEngine: Send + Sync {
    /// Queue a raw copy of `length` sectors starting at `offset`
    fn enqueue_raw_sectors(&mut self, offset: u32, length: u32, path: PathBuf, kind: &str);

    /// Queue a track transcode
    fn enqueue_track(&mut self, job: TrackJob);

    /// Run every queued job; blocks until done or interrupted
    fn start(&self) -> EngineReport;

    /// Ask running jobs to stop at the next step boundary
    fn interrupt(&self);
}

/// Outcome counters for one `start` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineReport {
    pub completed: usize,
    pub failed: usize,
    /// Jobs never started because of an interrupt or a fatal error
    pub skipped: usize,
    pub interrupted: bool,
    /// Message of the error that abandoned the queue, if any
    pub fatal: Option<String>,
}

impl EngineReport {
    pub(crate) fn merge(&mut self, other: EngineReport) {
        self.completed += other.completed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.interrupted |= other.interrupted;
        if self.fatal.is_none() {
            self.fatal = other.fatal;
        }
    }
}

/// How a single job ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// Stopped early at a step boundary after an interrupt
    Stopped,
}

/// Codec backend producing one track format
pub trait TrackEncoder: Send + Sync {
    fn format(&self) -> TrackFormat;

    /// Write `track` to `job.path`, calling `ctx.advance` per processed step
    /// and returning `JobOutcome::Stopped` once `ctx.should_stop()` is set.
    fn encode(
        &self,
        job: &TrackJob,
        track: &TrackInfo,
        source: &dyn SectorReader,
        ctx: &mut JobContext<'_>,
    ) -> Result<JobOutcome>;
}

/// Per-job view of the engine's stop flag and progress counters
pub struct JobContext<'a> {
    stop: &'a AtomicBool,
    progress: &'a dyn ProgressSink,
    total_sectors: u32,
    total_done: &'a AtomicU32,
    file_sectors: u32,
    file_done: u32,
}

impl<'a> JobContext<'a> {
    pub(crate) fn new(
        stop: &'a AtomicBool,
        progress: &'a dyn ProgressSink,
        total_sectors: u32,
        total_done: &'a AtomicU32,
        file_sectors: u32,
    ) -> Self {
        Self {
            stop,
            progress,
            total_sectors,
            total_done,
            file_sectors,
            file_done: 0,
        }
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Record `sectors` more processed sectors and report progress
    pub fn advance(&mut self, sectors: u32) {
        self.file_done = self.file_done.saturating_add(sectors).min(self.file_sectors);
        let total_done = self.total_done.fetch_add(sectors, Ordering::AcqRel) + sectors;
        self.progress.on_progress(
            self.total_sectors,
            total_done.min(self.total_sectors),
            self.file_sectors,
            self.file_done,
        );
    }

    pub fn file_sectors(&self) -> u32 {
        self.file_sectors
    }
}
