//! CUE sheet export
//!
//! One sheet per area, referencing the edit master DSDIFF file of the same
//! base name. Index times are relative to the first track of the area.

use crate::disc::DiscStructure;
use crate::error::{ExtractError, Result};
use crate::types::ChannelArea;
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

const FRAMES_PER_SECOND: u32 = 75;

/// Write the CUE sheet for `area` to `path`
///
/// The FILE line names `audio` when given, otherwise the `.dff` next to the
/// sheet. Uses atomic write pattern: writes to a temp file first, then renames.
pub fn write_cue_sheet(
    disc: &dyn DiscStructure,
    area: &ChannelArea,
    path: &Path,
    audio: Option<&Path>,
) -> Result<()> {
    let audio_file = audio
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.with_extension("dff"))
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let sheet = render_cue_sheet(disc, area, &audio_file, chrono::Utc::now().date_naive());

    let temp_path = path.with_extension("cue.tmp");
    std::fs::write(&temp_path, sheet).map_err(|e| ExtractError::output_error(path, e))?;
    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        ExtractError::output_error(path, e)
    })?;

    debug!("Wrote CUE sheet for {} area to {}", area.kind, path.display());
    Ok(())
}

/// Render the CUE sheet text
pub fn render_cue_sheet(
    disc: &dyn DiscStructure,
    area: &ChannelArea,
    audio_file: &str,
    date: chrono::NaiveDate,
) -> String {
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = writeln!(out, "REM DATE {}", date.format("%Y-%m-%d"));
    let _ = writeln!(out, "REM COMMENT \"Generated by sacd-extract {}\"", env!("CARGO_PKG_VERSION"));
    if let Some(artist) = disc.album_artist() {
        let _ = writeln!(out, "PERFORMER \"{}\"", escape(&artist));
    }
    if let Some(title) = disc.album_title() {
        let _ = writeln!(out, "TITLE \"{}\"", escape(&title));
    }
    let _ = writeln!(out, "FILE \"{}\" WAVE", escape(audio_file));

    let origin = disc.track(area.kind, 0).map(|t| t.start_frames).unwrap_or(0);

    for index in 0..area.track_count {
        let Some(track) = disc.track(area.kind, index) else {
            continue;
        };
        let _ = writeln!(out, "  TRACK {:02} AUDIO", index + 1);
        if let Some(title) = &track.title {
            let _ = writeln!(out, "    TITLE \"{}\"", escape(title));
        }
        if let Some(performer) = &track.performer {
            let _ = writeln!(out, "    PERFORMER \"{}\"", escape(performer));
        }
        let _ = writeln!(
            out,
            "    INDEX 01 {}",
            format_msf(track.start_frames.saturating_sub(origin))
        );
    }

    out
}

/// Format SACD frames as `MM:SS:FF`
pub fn format_msf(frames: u32) -> String {
    let total_seconds = frames / FRAMES_PER_SECOND;
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 60,
        total_seconds % 60,
        frames % FRAMES_PER_SECOND
    )
}

fn escape(value: &str) -> String {
    value.replace('"', "'")
}
