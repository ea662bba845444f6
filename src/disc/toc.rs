//! Minimal Scarletbook table-of-contents probe
//!
//! Reads the master TOC and each area TOC far enough to learn which areas
//! exist, their frame format, track count and per-track sector/time ranges.
//! Disc text, index lists and access lists are not interpreted.

use super::{DiscStructure, SectorReader};
use crate::error::{ExtractError, Result};
use crate::types::{AreaKind, ChannelArea, FrameFormat, TrackInfo, SECTOR_SIZE};
use tracing::{debug, warn};

/// Logical sector holding the master TOC
pub const MASTER_TOC_LSN: u32 = 510;

const MASTER_TOC_ID: &[u8; 8] = b"SACDMTOC";
const TWO_CHANNEL_TOC_ID: &[u8; 8] = b"TWOCHTOC";
const MULTI_CHANNEL_TOC_ID: &[u8; 8] = b"MULCHTOC";
const TRACK_LIST_ID: &[u8; 8] = b"SACDTRL1";
const TRACK_TIME_ID: &[u8; 8] = b"SACDTRL2";

// Master TOC field offsets
const AREA_1_TOC_START: usize = 64;
const AREA_2_TOC_START: usize = 72;

// Area TOC field offsets
const AREA_TOC_SIZE: usize = 10;
const AREA_FRAME_FORMAT: usize = 21;
const AREA_TRACK_COUNT: usize = 69;

const FRAME_FORMAT_DST: u8 = 0;
const MAX_AREA_TOC_SECTORS: u16 = 64;
const LIST_ENTRIES: usize = 255;
const FRAMES_PER_SECOND: u32 = 75;

#[derive(Debug, Clone)]
struct AreaToc {
    area: ChannelArea,
    tracks: Vec<TrackInfo>,
}

/// Parsed table of contents
#[derive(Debug, Clone, Default)]
pub struct ScarletbookToc {
    two_channel: Option<AreaToc>,
    multi_channel: Option<AreaToc>,
}

impl ScarletbookToc {
    /// Probe the TOC of `reader`
    pub fn read(reader: &dyn SectorReader) -> Result<Self> {
        let mut master = vec![0u8; SECTOR_SIZE];
        reader.read_sectors(MASTER_TOC_LSN, &mut master)?;

        if &master[..8] != MASTER_TOC_ID {
            return Err(ExtractError::InvalidDisc(format!(
                "master TOC signature missing at sector {}",
                MASTER_TOC_LSN
            )));
        }

        let two_start = be_u32(&master, AREA_1_TOC_START);
        let multi_start = be_u32(&master, AREA_2_TOC_START);
        debug!("Area TOC pointers: two-channel={}, multi-channel={}", two_start, multi_start);

        let two_channel = match two_start {
            0 => None,
            lsn => Some(read_area(reader, lsn, AreaKind::TwoChannel)?),
        };
        let multi_channel = match multi_start {
            0 => None,
            lsn => Some(read_area(reader, lsn, AreaKind::MultiChannel)?),
        };

        Ok(Self {
            two_channel,
            multi_channel,
        })
    }

    fn area_toc(&self, kind: AreaKind) -> Option<&AreaToc> {
        match kind {
            AreaKind::TwoChannel => self.two_channel.as_ref(),
            AreaKind::MultiChannel => self.multi_channel.as_ref(),
        }
    }
}

impl DiscStructure for ScarletbookToc {
    fn has_two_channel(&self) -> bool {
        self.two_channel.is_some()
    }

    fn has_multi_channel(&self) -> bool {
        self.multi_channel.is_some()
    }

    fn area(&self, kind: AreaKind) -> Option<ChannelArea> {
        self.area_toc(kind).map(|toc| toc.area)
    }

    fn track(&self, kind: AreaKind, index: usize) -> Option<TrackInfo> {
        self.area_toc(kind)?.tracks.get(index).cloned()
    }
}

fn read_area(reader: &dyn SectorReader, lsn: u32, kind: AreaKind) -> Result<AreaToc> {
    let mut header = vec![0u8; SECTOR_SIZE];
    reader.read_sectors(lsn, &mut header)?;

    let expected = match kind {
        AreaKind::TwoChannel => TWO_CHANNEL_TOC_ID,
        AreaKind::MultiChannel => MULTI_CHANNEL_TOC_ID,
    };
    if &header[..8] != expected {
        return Err(ExtractError::InvalidDisc(format!(
            "{} area TOC signature missing at sector {}",
            kind, lsn
        )));
    }

    let size = u16::from_be_bytes([header[AREA_TOC_SIZE], header[AREA_TOC_SIZE + 1]]);
    if size == 0 || size > MAX_AREA_TOC_SECTORS {
        return Err(ExtractError::InvalidDisc(format!(
            "{} area TOC has implausible size {}",
            kind, size
        )));
    }

    let frame_format = match header[AREA_FRAME_FORMAT] & 0x0f {
        FRAME_FORMAT_DST => FrameFormat::Compressed,
        _ => FrameFormat::Uncompressed,
    };
    let track_count = (header[AREA_TRACK_COUNT] as usize).min(LIST_ENTRIES);

    let mut data = vec![0u8; size as usize * SECTOR_SIZE];
    reader.read_sectors(lsn, &mut data)?;

    let mut tracks = vec![TrackInfo::default(); track_count];
    let mut found_list = false;

    for sector in data.chunks(SECTOR_SIZE) {
        let id = &sector[..8];
        if id == TRACK_LIST_ID {
            found_list = true;
            for (i, track) in tracks.iter_mut().enumerate() {
                track.start_sector = be_u32(sector, 8 + i * 4);
                track.sector_count = be_u32(sector, 8 + LIST_ENTRIES * 4 + i * 4);
            }
        } else if id == TRACK_TIME_ID {
            for (i, track) in tracks.iter_mut().enumerate() {
                track.start_frames = time_to_frames(&sector[8 + i * 4..]);
                track.duration_frames = time_to_frames(&sector[8 + LIST_ENTRIES * 4 + i * 4..]);
            }
        }
    }

    if !found_list && track_count > 0 {
        warn!("{} area has no track list; track extraction will fail", kind);
    }

    debug!(
        "{} area: {} tracks, {:?} frames",
        kind, track_count, frame_format
    );

    Ok(AreaToc {
        area: ChannelArea {
            kind,
            track_count,
            frame_format,
        },
        tracks,
    })
}

fn be_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

/// Convert a packed minutes/seconds/frames triple to SACD frames
fn time_to_frames(packed: &[u8]) -> u32 {
    let (minutes, seconds, frames) = (packed[0] as u32, packed[1] as u32, packed[2] as u32);
    (minutes * 60 + seconds) * FRAMES_PER_SECOND + frames
}
