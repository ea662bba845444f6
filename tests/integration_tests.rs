//! Integration tests for the sacd-extract pipeline
//!
//! These tests build a small synthetic Scarletbook image on disk and run the
//! full pipeline against it.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use sacd_extract::config::{Cli, ExtractionOptions};
use sacd_extract::disc::{DiscStructure, ImageFile, ScarletbookToc, SectorReader};
use sacd_extract::engine::{EngineReport, JobContext, JobOutcome, OutputEngine, TrackEncoder};
use sacd_extract::interrupt::{InterruptController, InterruptState};
use sacd_extract::pipeline::{self, Plan, RunOutcome};
use sacd_extract::progress::ProgressSink;
use sacd_extract::types::{TrackFormat, TrackInfo, TrackJob, SECTOR_SIZE};
use sacd_extract::{ExtractError, ExtractionJob};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const IMAGE_SECTORS: usize = 700;

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// Write a synthetic disc image with a two-channel area of three tracks
///
/// Master TOC at sector 510, area TOC at 540 (header, track list, track
/// times), track data at sectors 600..690.
fn write_test_image(path: &Path) -> Vec<u8> {
    let mut data: Vec<u8> = (0..IMAGE_SECTORS * SECTOR_SIZE)
        .map(|i| ((i / SECTOR_SIZE) % 251) as u8)
        .collect();

    let sector = |lsn: usize| lsn * SECTOR_SIZE..(lsn + 1) * SECTOR_SIZE;

    let master = &mut data[sector(510)];
    master.fill(0);
    master[..8].copy_from_slice(b"SACDMTOC");
    put_u32(master, 64, 540);

    let header = &mut data[sector(540)];
    header.fill(0);
    header[..8].copy_from_slice(b"TWOCHTOC");
    header[10..12].copy_from_slice(&3u16.to_be_bytes());
    header[21] = 2; // plain DSD
    header[69] = 3;

    let tracks: [(u32, u32); 3] = [(600, 20), (620, 30), (650, 40)];
    let list = &mut data[sector(541)];
    list.fill(0);
    list[..8].copy_from_slice(b"SACDTRL1");
    for (i, &(start, length)) in tracks.iter().enumerate() {
        put_u32(list, 8 + i * 4, start);
        put_u32(list, 8 + 255 * 4 + i * 4, length);
    }

    let times = &mut data[sector(542)];
    times.fill(0);
    times[..8].copy_from_slice(b"SACDTRL2");
    for i in 0..tracks.len() {
        // one minute per track
        times[8 + i * 4] = i as u8;
        times[8 + 255 * 4 + i * 4] = 1;
    }

    fs::write(path, &data).expect("Failed to write test image");
    data
}

/// Create options the way the CLI would
fn options(input: &Path, output: &Path, cli: Cli) -> ExtractionOptions {
    ExtractionOptions::from_cli(&Cli {
        input: input.to_path_buf(),
        output_dir: Some(output.to_path_buf()),
        ..cli
    })
    .expect("options should validate")
}

/// Progress sink that records every status line
#[derive(Default)]
struct RecordingSink {
    lines: Mutex<Vec<String>>,
    tracks: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn on_track_start(&self, display_name: &str, _current: usize, _total: usize, _decoding: bool) {
        self.tracks.lock().push(display_name.to_string());
    }

    fn on_progress(&self, _total: u32, _total_done: u32, _file: u32, _file_done: u32) {}

    fn status(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

/// Encoder writing the raw track sectors, enough to check routing
struct SectorDumpEncoder(TrackFormat);

impl TrackEncoder for SectorDumpEncoder {
    fn format(&self) -> TrackFormat {
        self.0
    }

    fn encode(
        &self,
        job: &TrackJob,
        track: &TrackInfo,
        source: &dyn SectorReader,
        ctx: &mut JobContext<'_>,
    ) -> sacd_extract::Result<JobOutcome> {
        let mut buf = vec![0u8; track.sector_count as usize * SECTOR_SIZE];
        source.read_sectors(track.start_sector, &mut buf)?;
        fs::write(&job.path, &buf)?;
        ctx.advance(track.sector_count);
        Ok(JobOutcome::Completed)
    }
}

fn controller() -> Arc<InterruptController> {
    Arc::new(InterruptController::new())
}

fn open_image(path: &Path) -> (ImageFile, ScarletbookToc) {
    let image = ImageFile::open(path).expect("image should open");
    let toc = ScarletbookToc::read(&image).expect("TOC should parse");
    (image, toc)
}

#[test]
fn test_iso_extraction_copies_whole_image() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("disc.img");
    let data = write_test_image(&input);

    let options = options(
        &input,
        output_dir.path(),
        Cli {
            output_iso: true,
            ..Default::default()
        },
    );
    let result = pipeline::run(&options, &controller()).expect("Pipeline should succeed");

    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(result.completed, 1);
    assert_eq!(result.failed, 0);

    let iso = fs::read(output_dir.path().join("disc.iso")).expect("ISO should exist");
    assert_eq!(iso.len(), data.len());
    assert!(iso == data, "ISO must match the source byte for byte");
}

#[test]
fn test_existing_iso_is_not_overwritten() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("disc.img");
    write_test_image(&input);
    fs::write(output_dir.path().join("disc.iso"), b"keep").unwrap();

    let options = options(
        &input,
        output_dir.path(),
        Cli {
            output_iso: true,
            ..Default::default()
        },
    );
    pipeline::run(&options, &controller()).expect("Pipeline should succeed");

    assert_eq!(fs::read(output_dir.path().join("disc.iso")).unwrap(), b"keep");
    assert!(output_dir.path().join("disc (1).iso").exists());
}

#[test]
fn test_cue_export_lists_every_track() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("disc.img");
    write_test_image(&input);
    let (image, toc) = open_image(&input);

    let options = options(
        &input,
        output_dir.path(),
        Cli {
            export_cue: true,
            album_name: Some("Quartets".to_string()),
            ..Default::default()
        },
    );
    let sink = RecordingSink::default();
    let interrupt = InterruptController::new();
    let result = pipeline::run_with(&options, &image, &toc, &sink, &interrupt, Vec::new()).unwrap();

    assert_eq!(result.completed, 1);

    let cue_path = output_dir.path().join("Quartets.cue");
    let cue = fs::read_to_string(&cue_path).expect("CUE sheet should exist");
    assert!(cue.contains("FILE \"Quartets.dff\" WAVE"));
    assert!(cue.contains("TRACK 03 AUDIO"));
    assert!(cue.contains("INDEX 01 02:00:00"));

    let lines = sink.lines();
    assert!(lines.iter().any(|l| l.starts_with("Exporting CUE sheet [")));
    assert_eq!(lines.last().map(String::as_str), Some("\rWe are done.."));
}

#[test]
fn test_cue_sheet_follows_renamed_edit_master() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("disc.img");
    write_test_image(&input);
    fs::write(output_dir.path().join("disc.dff"), b"stale master").unwrap();
    let (image, toc) = open_image(&input);

    let options = options(
        &input,
        output_dir.path(),
        Cli {
            output_dsdiff_em: true,
            ..Default::default()
        },
    );
    let sink = RecordingSink::default();
    let interrupt = InterruptController::new();
    pipeline::run_with(&options, &image, &toc, &sink, &interrupt, Vec::new()).unwrap();

    let cue = fs::read_to_string(output_dir.path().join("disc.cue")).expect("CUE sheet should exist");
    assert!(cue.contains("FILE \"disc (1).dff\" WAVE"));
    assert_eq!(fs::read(output_dir.path().join("disc.dff")).unwrap(), b"stale master");
}

#[test]
fn test_split_image_keeps_leftover_volume() {
    let output_dir = TempDir::new().unwrap();
    fs::write(output_dir.path().join("disc.iso.001"), b"leftover").unwrap();
    let options = options(
        Path::new("disc.img"),
        output_dir.path(),
        Cli {
            output_iso: true,
            ..Default::default()
        },
    );
    let disc_toc = ScarletbookToc::default();
    let areas = Vec::new();
    let request = pipeline::PlanRequest {
        options: &options,
        disc: &disc_toc,
        areas: &areas,
        album: "disc",
        total_sectors: 3_000_000,
    };
    let plan = pipeline::plan(&request, &sacd_extract::naming::NameResolver::new()).unwrap();

    let paths: Vec<_> = plan.jobs.iter().map(|job| job.path().to_path_buf()).collect();
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| !p.exists()));
    assert_eq!(paths[0], output_dir.path().join("disc (1).iso.001"));
}

#[test]
fn test_dry_run_leaves_ctrl_c_alone() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("disc.img");
    write_test_image(&input);

    let options = options(
        &input,
        output_dir.path(),
        Cli {
            output_iso: true,
            dry_run: true,
            ..Default::default()
        },
    );
    let interrupt = Arc::new(InterruptController::new());
    pipeline::run(&options, &interrupt).unwrap();
    pipeline::run(&options, &interrupt).unwrap();

    // nothing installed by the dry runs, so this is the first listener
    assert!(interrupt.install_console_handler().unwrap());
    assert!(!interrupt.install_console_handler().unwrap());
}

#[test]
fn test_selected_tracks_routed_to_encoder() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("disc.img");
    let data = write_test_image(&input);
    let (image, toc) = open_image(&input);

    let options = options(
        &input,
        output_dir.path(),
        Cli {
            output_dsf: true,
            select_tracks: Some("1,3,9".to_string()),
            ..Default::default()
        },
    );
    let sink = RecordingSink::default();
    let interrupt = InterruptController::new();
    let encoders: Vec<Box<dyn TrackEncoder>> = vec![Box::new(SectorDumpEncoder(TrackFormat::Dsf))];
    let result = pipeline::run_with(&options, &image, &toc, &sink, &interrupt, encoders).unwrap();

    assert_eq!(result.planned_jobs, 2, "track 9 does not exist on the disc");
    assert_eq!(result.completed, 2);

    let album_dir = output_dir.path().join("disc");
    let first = fs::read(album_dir.join("01 - Track 01.dsf")).unwrap();
    assert_eq!(&first[..], &data[600 * SECTOR_SIZE..620 * SECTOR_SIZE]);
    assert!(album_dir.join("03 - Track 03.dsf").exists());
    assert!(!album_dir.join("02 - Track 02.dsf").exists());

    let lines = sink.lines();
    assert!(lines.iter().any(|l| l.starts_with("DSF output: ")));
}

#[test]
fn test_tracks_without_encoder_fail_per_job() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("disc.img");
    write_test_image(&input);
    let (image, toc) = open_image(&input);

    let options = options(
        &input,
        output_dir.path(),
        Cli {
            output_dsdiff: true,
            output_iso: true,
            ..Default::default()
        },
    );
    let sink = RecordingSink::default();
    let interrupt = InterruptController::new();
    let result = pipeline::run_with(&options, &image, &toc, &sink, &interrupt, Vec::new()).unwrap();

    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(result.completed, 1, "ISO still extracted");
    assert_eq!(result.failed, 3);
    assert!(output_dir.path().join("disc.iso").exists());
}

#[test]
fn test_concurrent_mode_uses_separate_track_dir() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let track_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("disc.img");
    write_test_image(&input);
    let (image, toc) = open_image(&input);

    let options = options(
        &input,
        output_dir.path(),
        Cli {
            output_dsf: true,
            output_iso: true,
            concurrent: true,
            output_dir_conc: Some(track_dir.path().to_path_buf()),
            ..Default::default()
        },
    );
    let sink = RecordingSink::default();
    let interrupt = InterruptController::new();
    let encoders: Vec<Box<dyn TrackEncoder>> = vec![Box::new(SectorDumpEncoder(TrackFormat::Dsf))];
    let result = pipeline::run_with(&options, &image, &toc, &sink, &interrupt, encoders).unwrap();

    assert_eq!(result.completed, 4);
    assert!(output_dir.path().join("disc.iso").exists());
    assert!(track_dir.path().join("disc").join("02 - Track 02.dsf").exists());
    assert!(sink.lines().iter().any(|l| l == "Concurrent mode enabled."));
}

#[test]
fn test_dry_run_creates_nothing() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("disc.img");
    write_test_image(&input);
    let (image, toc) = open_image(&input);

    let options = options(
        &input,
        output_dir.path(),
        Cli {
            output_dsf: true,
            output_iso: true,
            dry_run: true,
            ..Default::default()
        },
    );
    let sink = RecordingSink::default();
    let interrupt = InterruptController::new();
    let result = pipeline::run_with(&options, &image, &toc, &sink, &interrupt, Vec::new()).unwrap();

    assert_eq!(result.planned_jobs, 4);
    assert_eq!(result.skipped, 4);
    assert_eq!(result.completed, 0);
    assert_eq!(fs::read_dir(output_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_output_dir_is_config_error() {
    let err = ExtractionOptions::from_cli(&Cli {
        input: PathBuf::from("disc.img"),
        output_iso: true,
        output_dir: Some(PathBuf::from("/nonexistent/sacd-output")),
        ..Default::default()
    })
    .unwrap_err();

    assert!(matches!(err, ExtractError::Config(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_missing_input_is_device_error() {
    let output_dir = TempDir::new().unwrap();
    let options = options(
        &output_dir.path().join("missing.img"),
        output_dir.path(),
        Cli {
            output_iso: true,
            ..Default::default()
        },
    );

    let err = pipeline::run(&options, &controller()).unwrap_err();
    assert!(matches!(err, ExtractError::Device { .. }));
    assert!(err.to_string().contains("No such file or device"));
}

/// Engine that blocks in `start` until interrupted
struct BlockingEngine {
    queued: usize,
    interrupts: AtomicUsize,
    started_tx: Sender<()>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
}

impl OutputEngine for BlockingEngine {
    fn enqueue_raw_sectors(&mut self, _offset: u32, _length: u32, _path: PathBuf, _kind: &str) {
        self.queued += 1;
    }

    fn enqueue_track(&mut self, _job: TrackJob) {
        self.queued += 1;
    }

    fn start(&self) -> EngineReport {
        let _ = self.started_tx.send(());
        let stopped = self.stop_rx.recv_timeout(Duration::from_secs(10)).is_ok();
        EngineReport {
            skipped: self.queued,
            interrupted: stopped,
            ..Default::default()
        }
    }

    fn interrupt(&self) {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
        let _ = self.stop_tx.try_send(());
    }
}

#[test]
fn test_interrupt_during_execution() {
    let output_dir = TempDir::new().unwrap();
    let options = options(
        Path::new("disc.img"),
        output_dir.path(),
        Cli {
            output_iso: true,
            ..Default::default()
        },
    );
    let plan = Plan {
        jobs: vec![ExtractionJob::RawSectorRange {
            offset: 0,
            length: 100,
            path: output_dir.path().join("disc.iso"),
        }],
        track_dirs: Vec::new(),
    };

    let (started_tx, started_rx) = bounded(1);
    let (stop_tx, stop_rx) = bounded(1);
    let mut engine = BlockingEngine {
        queued: 0,
        interrupts: AtomicUsize::new(0),
        started_tx,
        stop_tx,
        stop_rx,
    };
    let sink = RecordingSink::default();
    let interrupt = InterruptController::new();

    let result = thread::scope(|scope| {
        scope.spawn(|| {
            started_rx
                .recv_timeout(Duration::from_secs(10))
                .expect("engine should start");
            assert!(interrupt.request());
            // repeated Ctrl-C is ignored
            assert!(!interrupt.request());
        });
        pipeline::execute_plan(&mut engine, &plan, &options, &sink, &interrupt)
    });

    assert_eq!(result.outcome, RunOutcome::Interrupted);
    assert_eq!(engine.interrupts.load(Ordering::SeqCst), 1);
    assert_eq!(interrupt.state(), InterruptState::Stopped);

    let lines = sink.lines();
    let notices = lines.iter().filter(|l| l.contains("User interrupted")).count();
    assert_eq!(notices, 1);
    assert_eq!(lines.last().map(String::as_str), Some("\rWe are done.."));
}

#[test]
fn test_toc_probe_of_written_image() {
    let input_dir = TempDir::new().unwrap();
    let input = input_dir.path().join("disc.img");
    write_test_image(&input);
    let (image, toc) = open_image(&input);

    assert_eq!(image.total_sector_count(), IMAGE_SECTORS as u32);
    assert!(toc.has_two_channel());
    assert!(!toc.has_multi_channel());

    let track = toc.track(sacd_extract::AreaKind::TwoChannel, 2).unwrap();
    assert_eq!(track.start_sector, 650);
    assert_eq!(track.sector_count, 40);
    assert_eq!(track.start_frames, 2 * 60 * 75);
}
