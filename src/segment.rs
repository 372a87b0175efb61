//! One store + one index, sharing a base offset.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::config::SegmentConfig;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::store::Store;

fn store_path(dir: &Path, base_offset: u64) -> PathBuf {
    dir.join(format!("{base_offset:020}.store"))
}

fn index_path(dir: &Path, base_offset: u64) -> PathBuf {
    dir.join(format!("{base_offset:020}.index"))
}

/// A contiguous range of offsets backed by one store file and one index
/// file. The active segment in a [`crate::log::Log`] is the only one that
/// receives appends; all others are immutable.
pub struct Segment {
    store: Store,
    index: Index,
    dir: PathBuf,
    base_offset: u64,
    next_offset: u64,
    config: SegmentConfig,
}

impl Segment {
    /// Opens (or creates) the store and index files for `base_offset` under
    /// `dir`, recovering `next_offset` from the index's last entry.
    #[instrument(skip(dir, config), fields(base_offset))]
    pub fn open(dir: impl Into<PathBuf>, base_offset: u64, config: SegmentConfig) -> Result<Self> {
        let dir = dir.into();
        let store = Store::open(store_path(&dir, base_offset))?;
        let index = Index::open(index_path(&dir, base_offset), config.max_index_bytes)?;

        let next_offset = if index.is_empty() {
            base_offset
        } else {
            let (last_rel_offset, _) = index.read(None)?;
            base_offset + u64::from(last_rel_offset) + 1
        };

        debug!(base_offset, next_offset, "opened segment");

        Ok(Self {
            store,
            index,
            dir,
            base_offset,
            next_offset,
            config,
        })
    }

    /// Appends `payload`, returning the offset it was assigned.
    #[instrument(skip(self, payload), fields(payload_len = payload.len()))]
    pub fn append(&mut self, payload: &[u8]) -> Result<u64> {
        let offset = self.next_offset;
        let rel_offset = (offset - self.base_offset) as u32;

        let (_, position) = self.store.append(payload)?;
        self.index.write(rel_offset, position)?;
        self.next_offset += 1;

        Ok(offset)
    }

    /// Reads the record at the given global `offset`.
    ///
    /// Returns [`Error::OffsetOutOfRange`] if `offset` is outside
    /// `[base_offset, next_offset)`.
    pub fn read(&self, offset: u64) -> Result<Vec<u8>> {
        if offset < self.base_offset || offset >= self.next_offset {
            return Err(Error::OffsetOutOfRange {
                offset,
                lowest: self.base_offset,
                highest: self.next_offset.saturating_sub(1),
            });
        }

        let rel_offset = (offset - self.base_offset) as u32;
        let (_, position) = self.index.read(Some(rel_offset))?;
        self.store.read(position)
    }

    /// `true` once the store or index has reached its configured cap.
    pub fn is_maxed(&self) -> Result<bool> {
        Ok(self.store.size()? >= self.config.max_store_bytes
            || self.index.size() >= self.config.max_index_bytes)
    }

    /// First offset this segment can hold.
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Next offset this segment will assign to a new record.
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// `true` if `offset` falls within `[base_offset, next_offset)`.
    pub fn contains_offset(&self, offset: u64) -> bool {
        offset >= self.base_offset && offset < self.next_offset
    }

    /// Opens a fresh handle for sequentially reading this segment's store
    /// from the beginning, used by [`crate::log::Log::reader`].
    pub(crate) fn open_store_reader(&self) -> Result<std::fs::File> {
        self.store.open_reader()
    }

    /// Flushes the store, syncs and truncates the index, closing both.
    ///
    /// Index is closed first: its close truncates the file back to its
    /// logical size, which must happen before a crash could otherwise lose
    /// the store's still-buffered writes.
    pub fn close(&mut self) -> Result<()> {
        self.index.close()?;
        self.store.close()?;
        Ok(())
    }

    /// Closes, then unlinks both files.
    pub fn remove(mut self) -> Result<()> {
        self.close()?;
        std::fs::remove_file(store_path(&self.dir, self.base_offset))?;
        std::fs::remove_file(index_path(&self.dir, self.base_offset))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn cfg(max_store_bytes: u64, max_index_bytes: u64) -> SegmentConfig {
        SegmentConfig {
            max_store_bytes,
            max_index_bytes,
        }
    }

    #[test]
    fn append_assigns_sequential_offsets_from_base() {
        let dir = tempdir().unwrap();
        let mut seg = Segment::open(dir.path(), 100, cfg(1024, 1024)).unwrap();

        assert_eq!(seg.append(b"first").unwrap(), 100);
        assert_eq!(seg.append(b"second").unwrap(), 101);
        assert_eq!(seg.append(b"third").unwrap(), 102);
        assert_eq!(seg.next_offset(), 103);
    }

    #[test]
    fn read_round_trips() {
        let dir = tempdir().unwrap();
        let mut seg = Segment::open(dir.path(), 0, cfg(1024, 1024)).unwrap();

        let o1 = seg.append(b"hello").unwrap();
        let o2 = seg.append(b"world").unwrap();

        assert_eq!(seg.read(o1).unwrap(), b"hello");
        assert_eq!(seg.read(o2).unwrap(), b"world");
    }

    #[test]
    fn read_out_of_range_is_rejected() {
        let dir = tempdir().unwrap();
        let mut seg = Segment::open(dir.path(), 50, cfg(1024, 1024)).unwrap();
        seg.append(b"test").unwrap();

        assert!(seg.contains_offset(50));
        assert!(!seg.contains_offset(49));
        assert!(!seg.contains_offset(51));

        assert!(matches!(
            seg.read(49),
            Err(Error::OffsetOutOfRange { offset: 49, .. })
        ));
        assert!(matches!(
            seg.read(51),
            Err(Error::OffsetOutOfRange { offset: 51, .. })
        ));
    }

    #[test]
    fn is_maxed_by_store_or_index_cap() {
        let dir = tempdir().unwrap();
        // Each record here is 8 (len prefix) + 7 bytes = 15 bytes.
        let mut seg = Segment::open(dir.path(), 0, cfg(30, 1024)).unwrap();

        assert!(!seg.is_maxed().unwrap());
        seg.append(b"record0").unwrap();
        seg.append(b"record1").unwrap();
        assert!(seg.is_maxed().unwrap());
    }

    #[test]
    fn reopening_recovers_next_offset() {
        let dir = tempdir().unwrap();

        {
            let mut seg = Segment::open(dir.path(), 200, cfg(1024, 1024)).unwrap();
            seg.append(b"a").unwrap();
            seg.append(b"b").unwrap();
            seg.close().unwrap();
        }

        let mut seg = Segment::open(dir.path(), 200, cfg(1024, 1024)).unwrap();
        assert_eq!(seg.next_offset(), 202);
        assert_eq!(seg.read(200).unwrap(), b"a");
        assert_eq!(seg.read(201).unwrap(), b"b");
        assert_eq!(seg.append(b"c").unwrap(), 202);
    }
}
