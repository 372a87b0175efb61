//! An ordered sequence of segments forming one durable, append-only log.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::segment::Segment;

/// A durable, append-only commit log backed by a directory of segment
/// files.
///
/// Appends always land in the last (active) segment. Reads scan segments
/// in ascending `base_offset` order to find the one containing the
/// requested offset. All segment-list access goes through an `RwLock`: one
/// writer, many concurrent readers.
pub struct Log {
    dir: PathBuf,
    config: Config,
    segments: RwLock<Vec<Segment>>,
}

impl Log {
    /// Opens the log rooted at `dir`, creating it if empty or recovering
    /// existing segments from `*.store`/`*.index` files otherwise.
    #[instrument(skip(config), fields(dir = %dir.as_ref().display()))]
    pub fn open(dir: impl AsRef<Path>, config: Config) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let config = config.normalized();

        let base_offsets = discover_base_offsets(&dir)?;

        let segments = if base_offsets.is_empty() {
            vec![Segment::open(&dir, config.initial_offset, config.segment)?]
        } else {
            base_offsets
                .into_iter()
                .map(|base_offset| Segment::open(&dir, base_offset, config.segment))
                .collect::<Result<Vec<_>>>()?
        };

        info!(dir = %dir.display(), segment_count = segments.len(), "opened log");

        Ok(Self {
            dir,
            config,
            segments: RwLock::new(segments),
        })
    }

    /// Appends `record` to the active segment, then rolls over to a fresh
    /// active segment if that append left it maxed.
    ///
    /// The append and the maxed-check happen in that order, not the
    /// reverse: the assigned offset must be returned even if the
    /// subsequent rollover fails (disk full, fd exhaustion creating the
    /// new segment's files). A failed rollover just leaves the active
    /// segment maxed; the next `append` call re-attempts it.
    #[instrument(skip(self, record), fields(record_len = record.len()))]
    pub fn append(&self, record: &[u8]) -> Result<u64> {
        let mut segments = self.segments.write().map_err(|_| Error::LockPoisoned)?;

        let offset = segments
            .last_mut()
            .expect("a log always holds at least one segment")
            .append(record)?;

        let is_maxed = segments
            .last()
            .expect("checked above")
            .is_maxed()?;

        if is_maxed {
            let next_base = segments
                .last()
                .expect("checked above")
                .next_offset();

            match Segment::open(&self.dir, next_base, self.config.segment) {
                Ok(new_segment) => {
                    debug!(next_base, "rolled over to a new active segment");
                    segments.push(new_segment);
                }
                Err(err) => {
                    tracing::warn!(
                        %err,
                        next_base,
                        "rollover failed; active segment stays maxed, next append retries"
                    );
                }
            }
        }

        Ok(offset)
    }

    /// Reads the record at `offset`.
    pub fn read(&self, offset: u64) -> Result<Vec<u8>> {
        let segments = self.segments.read().map_err(|_| Error::LockPoisoned)?;

        let segment = segments
            .iter()
            .find(|s| s.contains_offset(offset))
            .ok_or_else(|| Error::OffsetOutOfRange {
                offset,
                lowest: segments.first().map_or(0, Segment::base_offset),
                highest: segments.last().map_or(0, |s| s.next_offset().saturating_sub(1)),
            })?;

        segment.read(offset)
    }

    /// Lowest offset currently held (the first segment's base offset).
    pub fn lowest_offset(&self) -> Result<u64> {
        let segments = self.segments.read().map_err(|_| Error::LockPoisoned)?;
        Ok(segments.first().map_or(0, Segment::base_offset))
    }

    /// Highest offset currently held, or `lowest_offset() - 1`'s
    /// equivalent (the next offset that would be assigned, minus one) if
    /// the log is non-empty.
    pub fn highest_offset(&self) -> Result<u64> {
        let segments = self.segments.read().map_err(|_| Error::LockPoisoned)?;
        Ok(segments
            .last()
            .map_or(0, |s| s.next_offset().saturating_sub(1)))
    }

    /// Removes every segment whose highest offset is below `lowest`,
    /// always keeping the active (last) segment regardless of how low
    /// `lowest` is, since there must always be somewhere for the next
    /// append to go.
    #[instrument(skip(self))]
    pub fn truncate(&self, lowest: u64) -> Result<()> {
        let mut segments = self.segments.write().map_err(|_| Error::LockPoisoned)?;
        let last_index = segments.len() - 1;

        let mut kept = Vec::with_capacity(segments.len());
        for (i, segment) in segments.drain(..).enumerate() {
            if i != last_index && segment.next_offset() <= lowest + 1 {
                segment.remove()?;
            } else {
                kept.push(segment);
            }
        }

        *segments = kept;
        Ok(())
    }

    /// Closes every segment, flushing and syncing all underlying files.
    pub fn close(&self) -> Result<()> {
        let mut segments = self.segments.write().map_err(|_| Error::LockPoisoned)?;
        for segment in segments.iter_mut() {
            segment.close()?;
        }
        Ok(())
    }

    /// Closes the log and removes its entire directory.
    pub fn remove(self) -> Result<()> {
        self.close()?;
        std::fs::remove_dir_all(&self.dir)?;
        Ok(())
    }

    /// Closes the log, deletes its directory, then reopens a fresh, empty
    /// log at the same path with the same configuration.
    pub fn reset(self) -> Result<Self> {
        let dir = self.dir.clone();
        let config = self.config;
        self.remove()?;
        Self::open(dir, config)
    }

    /// Returns a reader over the concatenated bytes of every segment's
    /// store file, in base-offset order, from the beginning of the log.
    ///
    /// Used for bulk export/snapshotting; it is not offset-aware and
    /// yields the raw on-disk store format (length-prefixed records).
    pub fn reader(&self) -> Result<impl Read> {
        let segments = self.segments.read().map_err(|_| Error::LockPoisoned)?;
        let files = segments
            .iter()
            .map(Segment::open_store_reader)
            .collect::<Result<Vec<File>>>()?;
        Ok(ChainReader::new(files))
    }
}

impl Drop for Log {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(%err, "failed to close log on drop");
        }
    }
}

/// Scans `dir` for `{base_offset}.store` / `{base_offset}.index` file
/// pairs and returns their base offsets in ascending order.
///
/// Filenames that aren't in the expected `{u64}.store`/`{u64}.index`
/// pattern are silently ignored.
fn discover_base_offsets(dir: &Path) -> io::Result<Vec<u64>> {
    let mut base_offsets = BTreeSet::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        if ext != "store" && ext != "index" {
            continue;
        }
        if let Ok(base_offset) = stem.parse::<u64>() {
            base_offsets.insert(base_offset);
        }
    }

    Ok(base_offsets.into_iter().collect())
}

/// Reads a sequence of files back to back as one contiguous stream.
struct ChainReader {
    files: std::vec::IntoIter<File>,
    current: Option<File>,
}

impl ChainReader {
    fn new(files: Vec<File>) -> Self {
        let mut files = files.into_iter();
        let current = files.next();
        Self { files, current }
    }
}

impl Read for ChainReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let Some(file) = self.current.as_mut() else {
                return Ok(0);
            };
            let n = file.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            self.current = self.files.next();
        }
    }
}
