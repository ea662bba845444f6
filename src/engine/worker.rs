//! Pipeline-per-worker engine
//!
//! Jobs are grouped by `PipelineId`. A single pipeline runs on the calling
//! thread in queue order; two pipelines run on one scoped worker each, with
//! no ordering between them. Workers look at the stop flag between sector
//! chunks and between jobs.

use super::{EngineReport, JobContext, JobOutcome, OutputEngine, TrackEncoder};
use crate::disc::{DiscStructure, SectorReader};
use crate::error::{ExtractError, Result};
use crate::progress::ProgressSink;
use crate::types::{PipelineId, TrackFormat, TrackInfo, TrackJob, SECTOR_SIZE};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::thread;
use tracing::{debug, error, info};

/// Sectors copied per step of a raw job
const COPY_CHUNK_SECTORS: u32 = 64;

#[derive(Debug, Clone)]
enum QueuedJob {
    Raw {
        offset: u32,
        length: u32,
        path: PathBuf,
        kind: String,
    },
    Track(TrackJob),
}

impl QueuedJob {
    fn pipeline_id(&self) -> PipelineId {
        match self {
            QueuedJob::Raw { .. } => PipelineId::Main,
            QueuedJob::Track(job) => job.pipeline_id,
        }
    }

    fn path(&self) -> &Path {
        match self {
            QueuedJob::Raw { path, .. } => path,
            QueuedJob::Track(job) => &job.path,
        }
    }
}

/// Engine executing raw copies directly and tracks through encoders
pub struct PipelineEngine<'a> {
    source: &'a dyn SectorReader,
    disc: &'a dyn DiscStructure,
    progress: &'a dyn ProgressSink,
    encoders: HashMap<TrackFormat, Box<dyn TrackEncoder>>,
    queue: Vec<QueuedJob>,
    stop: AtomicBool,
    total_done: AtomicU32,
    started_jobs: AtomicUsize,
    fatal: Mutex<Option<String>>,
}

impl<'a> PipelineEngine<'a> {
    pub fn new(
        source: &'a dyn SectorReader,
        disc: &'a dyn DiscStructure,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            source,
            disc,
            progress,
            encoders: HashMap::new(),
            queue: Vec::new(),
            stop: AtomicBool::new(false),
            total_done: AtomicU32::new(0),
            started_jobs: AtomicUsize::new(0),
            fatal: Mutex::new(None),
        }
    }

    /// Register the backend for one track format
    pub fn register_encoder(&mut self, encoder: Box<dyn TrackEncoder>) {
        self.encoders.insert(encoder.format(), encoder);
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Sector range a track job covers; edit masters span the whole area
    fn track_info(&self, job: &TrackJob) -> Result<TrackInfo> {
        if job.format != TrackFormat::DsdiffEditMaster {
            return self
                .disc
                .track(job.area, job.track_index)
                .ok_or_else(|| ExtractError::TrackNotFound {
                    area: job.area.to_string(),
                    track: job.track_index + 1,
                });
        }

        let count = self.disc.area(job.area).map(|a| a.track_count).unwrap_or(0);
        let first = self.disc.track(job.area, 0);
        let last = count.checked_sub(1).and_then(|i| self.disc.track(job.area, i));
        match (first, last) {
            (Some(first), Some(last)) => Ok(TrackInfo {
                title: None,
                performer: None,
                start_sector: first.start_sector,
                sector_count: (last.start_sector + last.sector_count).saturating_sub(first.start_sector),
                start_frames: first.start_frames,
                duration_frames: (last.start_frames + last.duration_frames)
                    .saturating_sub(first.start_frames),
            }),
            _ => Err(ExtractError::TrackNotFound {
                area: job.area.to_string(),
                track: 1,
            }),
        }
    }

    fn job_sectors(&self, job: &QueuedJob) -> u32 {
        match job {
            QueuedJob::Raw { length, .. } => *length,
            QueuedJob::Track(track) => self.track_info(track).map(|t| t.sector_count).unwrap_or(0),
        }
    }

    fn should_abandon(&self) -> bool {
        self.stop.load(Ordering::Acquire) || self.fatal.lock().is_some()
    }

    fn run_pipeline(&self, pipeline: PipelineId, jobs: &[&QueuedJob], total_sectors: u32) -> EngineReport {
        let mut report = EngineReport::default();
        debug!("Pipeline {:?} starting with {} jobs", pipeline, jobs.len());

        for (i, job) in jobs.iter().enumerate() {
            if self.should_abandon() {
                report.skipped += jobs.len() - i;
                break;
            }

            match self.execute(job, total_sectors) {
                Ok(JobOutcome::Completed) => report.completed += 1,
                Ok(JobOutcome::Stopped) => {
                    report.skipped += jobs.len() - i;
                    break;
                }
                Err(e) => {
                    error!("Job for {} failed: {}", job.path().display(), e);
                    self.progress.status(&format!("\rFailed: {}", e));
                    report.failed += 1;
                    if e.is_fatal() {
                        self.fatal.lock().get_or_insert_with(|| e.to_string());
                        report.skipped += jobs.len() - i - 1;
                        break;
                    }
                }
            }
        }

        report.interrupted = self.stop.load(Ordering::Acquire);
        report
    }

    fn execute(&self, job: &QueuedJob, total_sectors: u32) -> Result<JobOutcome> {
        let current = self.started_jobs.fetch_add(1, Ordering::AcqRel) + 1;
        let display_name = job
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match job {
            QueuedJob::Raw { offset, length, path, kind } => {
                debug!("Copying {} sectors from {} as {}", length, offset, kind);
                self.progress.on_track_start(&display_name, current, self.queue.len(), false);
                let mut ctx = JobContext::new(&self.stop, self.progress, total_sectors, &self.total_done, *length);
                copy_sectors(self.source, *offset, *length, path, &mut ctx)
            }
            QueuedJob::Track(track_job) => {
                let encoder = self
                    .encoders
                    .get(&track_job.format)
                    .ok_or_else(|| ExtractError::EncoderUnavailable {
                        format: track_job.format.to_string(),
                    })?;
                let track = self.track_info(track_job)?;
                self.progress.on_track_start(
                    &display_name,
                    current,
                    self.queue.len(),
                    track_job.decode_required,
                );
                let mut ctx = JobContext::new(
                    &self.stop,
                    self.progress,
                    total_sectors,
                    &self.total_done,
                    track.sector_count,
                );
                encoder.encode(track_job, &track, self.source, &mut ctx)
            }
        }
    }
}

impl OutputEngine for PipelineEngine<'_> {
    fn enqueue_raw_sectors(&mut self, offset: u32, length: u32, path: PathBuf, kind: &str) {
        self.queue.push(QueuedJob::Raw {
            offset,
            length,
            path,
            kind: kind.to_string(),
        });
    }

    fn enqueue_track(&mut self, job: TrackJob) {
        self.queue.push(QueuedJob::Track(job));
    }

    fn start(&self) -> EngineReport {
        let mut pipelines: BTreeMap<PipelineId, Vec<&QueuedJob>> = BTreeMap::new();
        for job in &self.queue {
            pipelines.entry(job.pipeline_id()).or_default().push(job);
        }

        let total_sectors = self
            .queue
            .iter()
            .fold(0u32, |acc, job| acc.saturating_add(self.job_sectors(job)));

        let mut report = EngineReport::default();

        if pipelines.len() > 1 {
            info!("Running {} pipelines concurrently", pipelines.len());
            let results: Vec<EngineReport> = thread::scope(|scope| {
                let handles: Vec<_> = pipelines
                    .iter()
                    .map(|(&pipeline, jobs)| {
                        scope.spawn(move || self.run_pipeline(pipeline, jobs, total_sectors))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle.join().unwrap_or_else(|_| {
                            error!("Pipeline worker panicked");
                            EngineReport {
                                failed: 1,
                                fatal: Some("pipeline worker panicked".to_string()),
                                ..Default::default()
                            }
                        })
                    })
                    .collect()
            });
            for result in results {
                report.merge(result);
            }
        } else if let Some((&pipeline, jobs)) = pipelines.iter().next() {
            report = self.run_pipeline(pipeline, jobs, total_sectors);
        }

        if report.fatal.is_none() {
            report.fatal = self.fatal.lock().clone();
        }
        report
    }

    fn interrupt(&self) {
        debug!("Engine interrupt requested");
        self.stop.store(true, Ordering::Release);
    }
}

/// Copy a sector range to `path`, one chunk per step
fn copy_sectors(
    source: &dyn SectorReader,
    offset: u32,
    length: u32,
    path: &Path,
    ctx: &mut JobContext<'_>,
) -> Result<JobOutcome> {
    let file = File::create(path).map_err(|e| ExtractError::job_failed(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut buf = vec![0u8; COPY_CHUNK_SECTORS as usize * SECTOR_SIZE];
    let mut done = 0u32;

    while done < length {
        if ctx.should_stop() {
            writer.flush().map_err(|e| ExtractError::job_failed(path, e))?;
            return Ok(JobOutcome::Stopped);
        }

        let count = (length - done).min(COPY_CHUNK_SECTORS);
        let chunk = &mut buf[..count as usize * SECTOR_SIZE];
        source.read_sectors(offset + done, chunk)?;
        writer
            .write_all(chunk)
            .map_err(|e| ExtractError::job_failed(path, e))?;

        done += count;
        ctx.advance(count);
    }

    writer.flush().map_err(|e| ExtractError::job_failed(path, e))?;
    Ok(JobOutcome::Completed)
}
