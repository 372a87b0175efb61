//! Memory-mapped, fixed-width offset index.
//!
//! Maps a segment-relative offset to the byte position of the corresponding
//! record in that segment's store.
//!
//! # File Format
//!
//! ```text
//! +-----------------------+--------------------------+
//! | rel_offset : u32 BE   | store_position : u64 BE  |
//! +-----------------------+--------------------------+
//! ```
//!
//! The file is pre-truncated to `max_index_bytes` on open so that appends
//! through the memory map never grow the file (which would trigger SIGBUS
//! for bytes mapped past the old end-of-file). On close, the file is
//! truncated back down to its logical size — `entries * ENTRY_WIDTH` — so a
//! later open can recover the entry count from the file's length alone.

use std::fs::File;
use std::path::Path;

use memmap2::MmapMut;
use tracing::debug;

use crate::error::{Error, Result};

/// Width in bytes of the relative-offset field.
pub const OFFSET_WIDTH: u64 = 4;
/// Width in bytes of the store-position field.
pub const POSITION_WIDTH: u64 = 8;
/// Total width in bytes of one index entry.
pub const ENTRY_WIDTH: u64 = OFFSET_WIDTH + POSITION_WIDTH;

/// A memory-mapped, append-only table of `(rel_offset, position)` entries.
pub struct Index {
    file: File,
    mmap: MmapMut,
    /// Number of logically written bytes. Always a multiple of `ENTRY_WIDTH`.
    size: u64,
}

impl Index {
    /// Opens (or creates) the index file at `path`, recovers its logical
    /// size from the filesystem, then pre-truncates it to `max_index_bytes`
    /// and maps the whole pre-truncated region read-write.
    pub fn open(path: impl AsRef<Path>, max_index_bytes: u64) -> Result<Self> {
        let file = File::options()
            .create(true)
            .read(true)
            .write(true)
            .open(path.as_ref())?;

        let size = file.metadata()?.len();
        file.set_len(max_index_bytes)?;

        // SAFETY: `file` outlives the mapping (both are owned by `self` and
        // dropped together in `close`), and no other process is expected to
        // truncate or otherwise mutate this file concurrently — it is
        // exclusively owned by this segment for its entire lifetime.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        debug!(path = %path.as_ref().display(), size, max_index_bytes, "opened index");

        Ok(Self { file, mmap, size })
    }

    /// Appends one `(rel_offset, position)` entry.
    ///
    /// Returns [`Error::SegmentFull`] if there is no room left in the
    /// pre-truncated mapped region.
    pub fn write(&mut self, rel_offset: u32, position: u64) -> Result<()> {
        let end = self.size + ENTRY_WIDTH;
        if end > self.mmap.len() as u64 {
            return Err(Error::SegmentFull);
        }

        let start = self.size as usize;
        let off_end = start + OFFSET_WIDTH as usize;
        let pos_end = off_end + POSITION_WIDTH as usize;

        self.mmap[start..off_end].copy_from_slice(&rel_offset.to_be_bytes());
        self.mmap[off_end..pos_end].copy_from_slice(&position.to_be_bytes());

        self.size = end;
        Ok(())
    }

    /// Reads the entry at row `row`, or the last entry if `row` is `None`.
    ///
    /// Returns [`Error::EndOfIndex`] if the index is empty or `row` is past
    /// the last logically written entry.
    pub fn read(&self, row: Option<u32>) -> Result<(u32, u64)> {
        if self.size == 0 {
            return Err(Error::EndOfIndex);
        }

        let row = match row {
            Some(row) => u64::from(row),
            None => self.size / ENTRY_WIDTH - 1,
        };

        let start = row * ENTRY_WIDTH;
        let end = start + ENTRY_WIDTH;
        if end > self.size {
            return Err(Error::EndOfIndex);
        }

        let start = start as usize;
        let off_end = start + OFFSET_WIDTH as usize;
        let pos_end = off_end + POSITION_WIDTH as usize;

        let rel_offset = u32::from_be_bytes(self.mmap[start..off_end].try_into().unwrap());
        let position = u64::from_be_bytes(self.mmap[off_end..pos_end].try_into().unwrap());

        Ok((rel_offset, position))
    }

    /// Number of entries currently written.
    pub fn len(&self) -> u64 {
        self.size / ENTRY_WIDTH
    }

    /// `true` if no entries have been written yet.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Logical size in bytes (`len() * ENTRY_WIDTH`).
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Capacity of the pre-truncated mapped region, in bytes.
    pub fn capacity(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Syncs the mapped region, fsyncs the file, then truncates the file
    /// back down to its logical size.
    ///
    /// Order matters: truncating before syncing the map would risk losing
    /// entries still sitting in the map's dirty pages.
    pub fn close(&mut self) -> Result<()> {
        self.mmap.flush()?;
        self.file.sync_all()?;
        self.file.set_len(self.size)?;
        Ok(())
    }
}
