//! Disc access collaborators
//!
//! The orchestrator only sees these traits. `ImageFile` reads sectors from a
//! raw image on disk, `ScarletbookToc` probes just enough of the table of
//! contents to plan an extraction.

pub mod image;
pub mod toc;

pub use image::ImageFile;
pub use toc::ScarletbookToc;

use crate::error::Result;
use crate::types::{AreaKind, ChannelArea, TrackInfo};

/// Sector-addressed access to the source
pub trait SectorReader: Send + Sync {
    /// Total number of logical sectors on the source
    fn total_sector_count(&self) -> u32;

    /// Fill `buf` (a whole number of sectors) starting at `lsn`
    fn read_sectors(&self, lsn: u32, buf: &mut [u8]) -> Result<()>;
}

/// Program structure of the disc
pub trait DiscStructure: Send + Sync {
    fn has_two_channel(&self) -> bool;

    fn has_multi_channel(&self) -> bool;

    fn area(&self, kind: AreaKind) -> Option<ChannelArea>;

    /// Metadata for the 0-based `index`th track of an area
    fn track(&self, kind: AreaKind, index: usize) -> Option<TrackInfo>;

    fn album_title(&self) -> Option<String> {
        None
    }

    fn album_artist(&self) -> Option<String> {
        None
    }
}
