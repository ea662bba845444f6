//! Output naming
//!
//! Derives the album base name and hands out collision-free file and
//! directory paths. A resolver remembers every path it returned, so two jobs
//! asking for the same name in one run never receive the same target even
//! before either file exists.

use crate::disc::DiscStructure;
use crate::error::{ExtractError, Result};
use crate::types::{AreaKind, TrackInfo};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name used when neither the disc nor the user provide one
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Hands out paths that do not exist and were not handed out before
#[derive(Debug)]
pub struct NameResolver {
    issued: Mutex<HashSet<PathBuf>>,
    create_dirs: bool,
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl NameResolver {
    pub fn new() -> Self {
        Self {
            issued: Mutex::new(HashSet::new()),
            create_dirs: true,
        }
    }

    /// Resolver that reserves directory names without creating them (dry runs)
    pub fn planning_only() -> Self {
        Self {
            create_dirs: false,
            ..Self::new()
        }
    }

    /// Return `dir/base.ext`, or `dir/base (N).ext` for the first free N
    pub fn unique_path(&self, dir: &Path, base: &str, ext: &str) -> PathBuf {
        self.claim(|n| match n {
            0 => dir.join(format!("{}.{}", base, ext)),
            n => dir.join(format!("{} ({}).{}", base, n, ext)),
        })
    }

    /// Reserve a directory name under `parent` and create it
    pub fn unique_directory(&self, parent: &Path, base: &str) -> Result<PathBuf> {
        let dir = self.claim(|n| match n {
            0 => parent.join(base),
            n => parent.join(format!("{} ({})", base, n)),
        });
        if self.create_dirs {
            std::fs::create_dir(&dir).map_err(|e| ExtractError::output_error(&dir, e))?;
            debug!("Created output directory {}", dir.display());
        }
        Ok(dir)
    }

    /// Reserve `count` numbered volumes `base.ext.001 ..= base.ext.NNN`
    ///
    /// The family is resolved as a unit: the first disambiguator for which no
    /// volume exists or was handed out wins, so a leftover `.001` moves the
    /// whole set to `base (1).ext.NNN`.
    pub fn unique_volume_set(&self, dir: &Path, base: &str, ext: &str, count: usize) -> Vec<PathBuf> {
        let family = |n: usize| -> Vec<PathBuf> {
            let stem = match n {
                0 => base.to_string(),
                n => format!("{} ({})", base, n),
            };
            (1..=count)
                .map(|i| dir.join(format!("{}.{}.{:03}", stem, ext, i)))
                .collect()
        };

        let mut issued = self.issued.lock();
        let mut n = 0;
        loop {
            let volumes = family(n);
            if volumes.iter().all(|v| !issued.contains(v) && !v.exists()) {
                issued.extend(volumes.iter().cloned());
                return volumes;
            }
            n += 1;
        }
    }

    fn claim(&self, candidate: impl Fn(usize) -> PathBuf) -> PathBuf {
        let mut issued = self.issued.lock();
        let mut n = 0;
        loop {
            let path = candidate(n);
            if !issued.contains(&path) && !path.exists() {
                issued.insert(path.clone());
                return path;
            }
            n += 1;
        }
    }
}

/// Replace characters that cannot appear in a path component
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim().trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        UNKNOWN_ALBUM.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Album base name: explicit override, then disc text, then `fallback`
pub fn album_base_name(
    override_name: Option<&str>,
    disc: &dyn DiscStructure,
    fallback: Option<&str>,
) -> String {
    if let Some(name) = override_name.filter(|n| !n.trim().is_empty()) {
        return sanitize_component(name);
    }

    let from_disc = match (disc.album_artist(), disc.album_title()) {
        (Some(artist), Some(title)) => Some(format!("{} - {}", artist, title)),
        (None, Some(title)) => Some(title),
        _ => None,
    };

    from_disc
        .as_deref()
        .or(fallback)
        .map(sanitize_component)
        .unwrap_or_else(|| UNKNOWN_ALBUM.to_string())
}

/// Album name with the area qualifier when several areas are extracted
pub fn area_qualified(album: &str, area: AreaKind, multiple_areas: bool) -> String {
    if multiple_areas {
        format!("{} {}", album, area.qualifier())
    } else {
        album.to_string()
    }
}

/// Per-track file stem, e.g. `"03 - Adagio"`
pub fn track_file_stem(index: usize, track: Option<&TrackInfo>) -> String {
    let number = index + 1;
    match track.and_then(|t| t.title.as_deref()) {
        Some(title) => format!("{:02} - {}", number, sanitize_component(title)),
        None => format!("{:02} - Track {:02}", number, number),
    }
}
