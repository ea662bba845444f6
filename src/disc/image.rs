//! Raw disc image reader

use super::SectorReader;
use crate::error::{ExtractError, Result};
use crate::types::SECTOR_SIZE;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sector reader backed by an ISO image file
///
/// Reads are serialized through a mutex so both pipelines can share one handle.
#[derive(Debug)]
pub struct ImageFile {
    path: PathBuf,
    file: Mutex<File>,
    total_sectors: u32,
}

impl ImageFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ExtractError::device(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| ExtractError::device(path, e))?
            .len();

        if len < SECTOR_SIZE as u64 {
            return Err(ExtractError::Device {
                path: path.to_path_buf(),
                reason: format!("image is only {} bytes", len),
            });
        }

        let total_sectors = u32::try_from(len / SECTOR_SIZE as u64).map_err(|_| ExtractError::Device {
            path: path.to_path_buf(),
            reason: "image exceeds the addressable sector range".to_string(),
        })?;

        debug!("Opened {} ({} sectors)", path.display(), total_sectors);

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            total_sectors,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SectorReader for ImageFile {
    fn total_sector_count(&self) -> u32 {
        self.total_sectors
    }

    fn read_sectors(&self, lsn: u32, buf: &mut [u8]) -> Result<()> {
        let to_read_err = |e: std::io::Error| ExtractError::SectorRead {
            lsn,
            reason: e.to_string(),
        };

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(lsn as u64 * SECTOR_SIZE as u64))
            .map_err(to_read_err)?;
        file.read_exact(buf).map_err(to_read_err)
    }
}
