//! Console progress reporting
//!
//! Both pipelines report through one `ProgressSink`. Every call renders its
//! whole line under a single lock and flushes before releasing it, so lines
//! from concurrent workers never interleave.

use crate::types::SECTOR_SIZE;
use parking_lot::Mutex;
use std::io::Write;
use std::time::Instant;

const MIB: f64 = 1024.0 * 1024.0;

/// Callback contract between the output engine and the console
pub trait ProgressSink: Send + Sync {
    /// A new output file is starting
    fn on_track_start(&self, display_name: &str, current: usize, total: usize, decoding: bool);

    /// Sector counters for the whole run and the current file
    fn on_progress(&self, total_sectors: u32, total_done: u32, file_sectors: u32, file_done: u32);

    /// A discrete status line (job failures, notices)
    fn status(&self, line: &str);

    /// Output is about to begin; throughput is measured from here
    fn mark_started(&self) {}
}

/// `ProgressSink` writing to a console stream
pub struct ConsoleReporter<W: Write + Send> {
    out: Mutex<W>,
    started: Mutex<Instant>,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            started: Mutex::new(Instant::now()),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn write_line(&self, line: &str) {
        let mut out = self.out.lock();
        // console write failures are not worth aborting an extraction for
        let _ = out.write_all(line.as_bytes());
        let _ = out.flush();
    }
}

impl<W: Write + Send> ProgressSink for ConsoleReporter<W> {
    fn on_track_start(&self, display_name: &str, current: usize, total: usize, decoding: bool) {
        let marker = if decoding { "(d) " } else { "" };
        self.write_line(&format!(
            "\rProcessing {}[{}] ({}/{})..\n",
            marker, display_name, current, total
        ));
    }

    fn on_progress(&self, total_sectors: u32, total_done: u32, file_sectors: u32, file_done: u32) {
        let elapsed = self.started.lock().elapsed().as_secs_f64();
        self.write_line(&format_progress(
            total_sectors,
            total_done,
            file_sectors,
            file_done,
            elapsed,
        ));
    }

    fn status(&self, line: &str) {
        self.write_line(&format!("{}\n", line));
    }

    fn mark_started(&self) {
        *self.started.lock() = Instant::now();
    }
}

fn percent(done: u32, total: u32) -> u64 {
    if total == 0 {
        0
    } else {
        done as u64 * 100 / total as u64
    }
}

fn sectors_to_mib(sectors: u32) -> f64 {
    sectors as f64 * SECTOR_SIZE as f64 / MIB
}

/// Render the overwritten progress line
pub fn format_progress(
    total_sectors: u32,
    total_done: u32,
    file_sectors: u32,
    file_done: u32,
    elapsed_secs: f64,
) -> String {
    let rate = if elapsed_secs > 0.0 {
        sectors_to_mib(total_done) / elapsed_secs
    } else {
        0.0
    };
    format!(
        "\rCompleted: {}% ({:.1}MB), Total: {}% ({:.1}MB) at {:.2}MB/sec",
        percent(file_done, file_sectors),
        sectors_to_mib(file_done),
        percent(total_done, total_sectors),
        sectors_to_mib(total_sectors),
        rate
    )
}
