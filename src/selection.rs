//! Area and track selection
//!
//! Resolves which program areas are extracted and which tracks inside them.

use crate::disc::DiscStructure;
use crate::types::{AreaKind, ChannelArea};
use tracing::{debug, warn};

/// Maximum number of tracks a Scarletbook area can hold
pub const MAX_TRACKS: usize = 256;

const WORDS: usize = MAX_TRACKS / 64;

/// Fixed-capacity set of 0-based track indices
///
/// Index `i` means "track `i + 1` selected". An empty set selects every track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackSelectionSet {
    bits: [u64; WORDS],
}

impl TrackSelectionSet {
    /// Parse a user selection such as `"1,5,13"` or `"2 4"`.
    ///
    /// Track numbers are 1-based and masked into the 0..=255 index range.
    /// Only the leading digits of a token count (`"7x"` is track 7, `"2.5"`
    /// is track 2). Tokens without leading digits, negative numbers and zero
    /// are skipped.
    pub fn parse(input: &str) -> Self {
        let mut set = Self::default();
        for token in input.split([',', ' ']).filter(|t| !t.is_empty()) {
            match leading_number(token) {
                None | Some(0) => debug!("Ignoring track selection token '{}'", token),
                Some(number) => set.insert_number(number),
            }
        }
        set
    }

    /// Build from 1-based track numbers, ignoring zero
    pub fn from_numbers<I: IntoIterator<Item = u64>>(numbers: I) -> Self {
        let mut set = Self::default();
        for number in numbers.into_iter().filter(|&n| n > 0) {
            set.insert_number(number);
        }
        set
    }

    fn insert_number(&mut self, number: u64) {
        let index = ((number - 1) & 0xff) as usize;
        self.bits[index / 64] |= 1 << (index % 64);
    }

    pub fn contains(&self, index: usize) -> bool {
        index < MAX_TRACKS && self.bits[index / 64] & (1 << (index % 64)) != 0
    }

    /// True when no explicit subset was chosen
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Ascending selected indices within an area of `track_count` tracks
    pub fn tracks_for(&self, track_count: usize) -> Vec<usize> {
        let count = track_count.min(MAX_TRACKS);
        if self.is_empty() {
            return (0..count).collect();
        }
        (0..count).filter(|&i| self.contains(i)).collect()
    }
}

/// Value of the leading decimal digits of `token`, after an optional `+`
fn leading_number(token: &str) -> Option<u64> {
    let trimmed = token.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    Some(digits[..end].bytes().fold(0u64, |acc, b| {
        acc.saturating_mul(10).saturating_add(u64::from(b - b'0'))
    }))
}

/// Resolve the ordered list of areas to process
///
/// Two-channel always comes before multi-channel. Requested areas the disc
/// does not carry are skipped with a warning.
pub fn select_areas(
    disc: &dyn DiscStructure,
    two_channel: bool,
    multi_channel: bool,
) -> Vec<ChannelArea> {
    let mut areas = Vec::with_capacity(2);

    let wanted = [
        (AreaKind::TwoChannel, two_channel, disc.has_two_channel()),
        (AreaKind::MultiChannel, multi_channel, disc.has_multi_channel()),
    ];

    for (kind, requested, available) in wanted {
        if !requested {
            continue;
        }
        match disc.area(kind).filter(|_| available) {
            Some(area) => areas.push(area),
            None => warn!("Disc has no {} area, skipping", kind),
        }
    }

    areas
}
