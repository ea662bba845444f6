//! Pipeline orchestration
//!
//! Coordinates disc probing, job planning, CUE export and the supervised
//! output engine run. The engine blocks in `start` on a scoped worker while
//! this thread waits for either completion or an interrupt wake-up.

use super::planner::{self, Plan, PlanRequest};
use crate::config::ExtractionOptions;
use crate::disc::{DiscStructure, ImageFile, ScarletbookToc, SectorReader};
use crate::engine::{EngineReport, OutputEngine, PipelineEngine, TrackEncoder};
use crate::error::Result;
use crate::export;
use crate::interrupt::{InterruptController, InterruptState};
use crate::naming::{self, NameResolver};
use crate::progress::{ConsoleReporter, ProgressSink};
use crate::selection;
use crate::types::{AreaKind, ChannelArea, ExtractionJob, FrameFormat};
use crossbeam_channel::{bounded, select};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Stopped by the user; teardown ran normally
    Interrupted,
    /// The engine abandoned the queue after a fatal error
    Failed(String),
}

/// Pipeline result summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    pub planned_jobs: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcome: RunOutcome,
}

impl PipelineResult {
    fn empty() -> Self {
        Self {
            planned_jobs: 0,
            completed: 0,
            failed: 0,
            skipped: 0,
            outcome: RunOutcome::Completed,
        }
    }
}

/// Run a full extraction against the image named in `options`
///
/// Ctrl-C is routed to `interrupt` only for runs that write output; print
/// and dry runs keep the default signal behavior.
pub fn run(options: &ExtractionOptions, interrupt: &Arc<InterruptController>) -> Result<PipelineResult> {
    let image = ImageFile::open(&options.input)?;
    let toc = ScarletbookToc::read(&image)?;
    let reporter = ConsoleReporter::stdout();

    if options.has_work() && !options.dry_run && interrupt.install_console_handler()? {
        debug!("Console interrupt handler installed");
    }

    // no DSF/DSDIFF codec ships with the binary
    run_with(options, &image, &toc, &reporter, interrupt, Vec::new())
}

/// Run an extraction against already opened collaborators
pub fn run_with(
    options: &ExtractionOptions,
    source: &dyn SectorReader,
    disc: &dyn DiscStructure,
    reporter: &dyn ProgressSink,
    interrupt: &InterruptController,
    encoders: Vec<Box<dyn TrackEncoder>>,
) -> Result<PipelineResult> {
    let pipeline_start = Instant::now();
    let total_sectors = source.total_sector_count();

    if options.print {
        print_disc_info(disc, total_sectors);
    }

    if !options.has_work() {
        debug!("No output requested");
        return Ok(PipelineResult::empty());
    }

    // Phase 1: Planning
    let areas = selection::select_areas(disc, options.two_channel, options.multi_channel);
    let fallback = options.input.file_stem().and_then(|s| s.to_str());
    let album = naming::album_base_name(options.album_name.as_deref(), disc, fallback);
    info!("Planning extraction of '{}' ({} areas)", album, areas.len());

    let resolver = if options.dry_run {
        NameResolver::planning_only()
    } else {
        NameResolver::new()
    };
    let request = PlanRequest {
        options,
        disc,
        areas: &areas,
        album: &album,
        total_sectors,
    };
    let plan = planner::plan(&request, &resolver)?;

    if options.dry_run {
        return run_dry_run(options, &plan, &album, total_sectors, &areas);
    }

    // Phase 2: CUE sheets, written synchronously before the engine starts
    let mut cue_failed = 0;
    let mut cue_done = 0;
    for job in plan.cue_jobs() {
        if let ExtractionJob::CueExport { area, path, audio } = job {
            reporter.status(&format!("Exporting CUE sheet [{}]", path.display()));
            let written = areas
                .iter()
                .find(|a| a.kind == *area)
                .map(|a| export::write_cue_sheet(disc, a, path, audio.as_deref()));
            match written {
                Some(Ok(())) => cue_done += 1,
                Some(Err(e)) => {
                    error!("CUE export failed: {}", e);
                    reporter.status(&format!("Failed: {}", e));
                    cue_failed += 1;
                }
                None => cue_failed += 1,
            }
        }
    }

    // Phase 3: Engine
    let mut engine = PipelineEngine::new(source, disc, reporter);
    for encoder in encoders {
        engine.register_encoder(encoder);
    }

    let mut result = execute_plan(&mut engine, &plan, options, reporter, interrupt);
    result.planned_jobs = plan.jobs.len();
    result.completed += cue_done;
    result.failed += cue_failed;

    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(result)
}

/// Enqueue the engine jobs of `plan`, run them under supervision and tear down
pub fn execute_plan<E: OutputEngine>(
    engine: &mut E,
    plan: &Plan,
    options: &ExtractionOptions,
    reporter: &dyn ProgressSink,
    interrupt: &InterruptController,
) -> PipelineResult {
    if options.is_concurrent() {
        reporter.status("Concurrent mode enabled.");
    }

    let mut announced_image = false;
    for job in plan.engine_jobs() {
        match job {
            ExtractionJob::RawSectorRange { offset, length, path } => {
                if !announced_image {
                    reporter.status(&format!("ISO output: {}", path.display()));
                    announced_image = true;
                }
                engine.enqueue_raw_sectors(*offset, *length, path.clone(), "iso");
            }
            ExtractionJob::TrackTranscode(track) => engine.enqueue_track(track.clone()),
            ExtractionJob::CueExport { .. } => {}
        }
    }

    if let Some(format) = options.track_format() {
        for (_, dir) in &plan.track_dirs {
            reporter.status(&format!("{} output: {}", format.label(), dir.display()));
        }
    }
    reporter.status("");
    reporter.mark_started();

    let report = supervise(engine, reporter, interrupt);

    let outcome = if interrupt.state() != InterruptState::Running {
        interrupt.mark_stopped();
        RunOutcome::Interrupted
    } else if let Some(message) = report.fatal.clone() {
        RunOutcome::Failed(message)
    } else {
        RunOutcome::Completed
    };

    reporter.status("\rWe are done..");

    PipelineResult {
        planned_jobs: plan.jobs.len(),
        completed: report.completed,
        failed: report.failed,
        skipped: report.skipped,
        outcome,
    }
}

/// Block in `engine.start()` on a worker while forwarding at most one interrupt
fn supervise<E: OutputEngine>(
    engine: &E,
    reporter: &dyn ProgressSink,
    interrupt: &InterruptController,
) -> EngineReport {
    let (done_tx, done_rx) = bounded::<EngineReport>(1);

    thread::scope(|scope| {
        scope.spawn(move || {
            let report = engine.start();
            let _ = done_tx.send(report);
        });

        let wakeups = interrupt.wakeups();
        loop {
            select! {
                recv(done_rx) -> report => {
                    // a request that raced with completion still gets its notice
                    forward_interrupt(engine, reporter, interrupt);
                    return report.unwrap_or_else(|_| {
                        error!("Output engine worker exited without a report");
                        EngineReport {
                            fatal: Some("output engine worker panicked".to_string()),
                            ..Default::default()
                        }
                    });
                }
                recv(wakeups) -> _ => forward_interrupt(engine, reporter, interrupt),
            }
        }
    })
}

fn forward_interrupt<E: OutputEngine>(
    engine: &E,
    reporter: &dyn ProgressSink,
    interrupt: &InterruptController,
) {
    if interrupt.state() == InterruptState::InterruptRequested {
        warn!("Interrupt received, stopping output engine");
        reporter.status("\rUser interrupted..");
        engine.interrupt();
        interrupt.begin_stopping();
    }
}

/// Dry run mode - show the plan without extracting
fn run_dry_run(
    options: &ExtractionOptions,
    plan: &Plan,
    album: &str,
    total_sectors: u32,
    areas: &[ChannelArea],
) -> Result<PipelineResult> {
    if options.json {
        export::write_plan_json(std::io::stdout().lock(), album, total_sectors, areas, &plan.jobs)?;
        println!();
    } else {
        println!();
        println!("=== DRY RUN MODE ===");
        println!();
        for (i, job) in plan.jobs.iter().enumerate() {
            println!("{:>3}. {}", i + 1, describe_job(job));
        }
        println!();
        println!("Would run {} jobs", plan.jobs.len());
    }

    Ok(PipelineResult {
        planned_jobs: plan.jobs.len(),
        skipped: plan.jobs.len(), // All "skipped" in dry run mode
        ..PipelineResult::empty()
    })
}

/// One-line description of a job for dry-run output
pub fn describe_job(job: &ExtractionJob) -> String {
    match job {
        ExtractionJob::RawSectorRange { offset, length, path } => {
            format!("image  sectors {}..{} -> {}", offset, offset + length, path.display())
        }
        ExtractionJob::TrackTranscode(track) => format!(
            "{:<6} {} track {:02}{}{} [{:?}] -> {}",
            track.format.extension(),
            track.area,
            track.track_index + 1,
            if track.decode_required { " decode" } else { "" },
            if track.pad_required { " pad" } else { "" },
            track.pipeline_id,
            track.path.display()
        ),
        ExtractionJob::CueExport { area, path, .. } => {
            format!("cue    {} -> {}", area, path.display())
        }
    }
}

fn print_disc_info(disc: &dyn DiscStructure, total_sectors: u32) {
    println!();
    if let Some(title) = disc.album_title() {
        println!("Album: {}", title);
    }
    if let Some(artist) = disc.album_artist() {
        println!("Artist: {}", artist);
    }
    println!("Sectors: {}", total_sectors);

    for kind in [AreaKind::TwoChannel, AreaKind::MultiChannel] {
        let Some(area) = disc.area(kind) else {
            continue;
        };
        let format = match area.frame_format {
            FrameFormat::Compressed => "DST",
            FrameFormat::Uncompressed => "DSD",
        };
        println!();
        println!("{} area: {} tracks ({})", kind, area.track_count, format);
        for index in 0..area.track_count {
            let track = disc.track(kind, index);
            let length = track
                .as_ref()
                .map(|t| export::cue::format_msf(t.duration_frames))
                .unwrap_or_default();
            println!("  {}  {}", naming::track_file_stem(index, track.as_ref()), length);
        }
    }
    println!();
}
