//! Length-prefixed, append-only payload file with positional reads.
//!
//! # File Format
//!
//! ```text
//! +------------------+--------------------+
//! | length : u64 BE  | payload : length B |
//! +------------------+--------------------+
//! ```
//!
//! Records are appended through a buffered writer and read back with
//! positional (`pread`-style) reads, so concurrent readers never disturb the
//! writer's cursor.

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{Error, Result};

/// Width in bytes of the length prefix on every store entry.
pub const LEN_WIDTH: u64 = 8;

struct Inner {
    file: File,
    writer: BufWriter<File>,
    size: u64,
}

/// A durable, append-only file of length-prefixed byte payloads.
///
/// All operations serialize through an internal mutex: reads must flush the
/// buffered writer before they can see data the writer has buffered but not
/// yet handed to the OS, so the mutex has to cover both paths.
pub struct Store {
    inner: Mutex<Inner>,
}

impl Store {
    /// Opens (or creates) the store file at `path`, recovering its current
    /// size from the filesystem.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let file = File::options()
            .create(true)
            .read(true)
            .append(true)
            .open(path.as_ref())?;
        let size = file.metadata()?.len();
        let writer = BufWriter::new(file.try_clone()?);

        debug!(path = %path.as_ref().display(), size, "opened store");

        Ok(Self {
            inner: Mutex::new(Inner { file, writer, size }),
        })
    }

    /// Appends `payload`, returning `(bytes_written, position)` where
    /// `position` is the byte offset at which the new entry begins.
    ///
    /// The length prefix and payload are assembled into one contiguous
    /// buffer before the single `write_all` call that hands them to the
    /// buffered writer, so a partial write can never leave the length
    /// prefix written without its payload: either the whole record reaches
    /// the `BufWriter`'s internal buffer, or `size` is left untouched.
    pub fn append(&self, payload: &[u8]) -> Result<(u64, u64)> {
        let mut inner = self.inner.lock().map_err(|_| Error::LockPoisoned)?;

        let position = inner.size;
        let mut record = Vec::with_capacity(LEN_WIDTH as usize + payload.len());
        record.extend_from_slice(&(payload.len() as u64).to_be_bytes());
        record.extend_from_slice(payload);

        inner.writer.write_all(&record)?;

        let written = record.len() as u64;
        inner.size += written;

        Ok((written, position))
    }

    /// Reads back the record written by a prior `append` at the given
    /// `position`, flushing any buffered writes first so the read always
    /// sees its own prior writes.
    pub fn read(&self, position: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock().map_err(|_| Error::LockPoisoned)?;
        inner.writer.flush()?;

        let mut len_buf = [0u8; LEN_WIDTH as usize];
        read_at(&inner.file, &mut len_buf, position)?;
        let len = u64::from_be_bytes(len_buf);

        let mut payload = vec![0u8; len as usize];
        read_at(&inner.file, &mut payload, position + LEN_WIDTH)?;

        Ok(payload)
    }

    /// Positional read of `buf.len()` bytes starting at `offset`, flushing
    /// buffered writes first. Mirrors `ReadAt` in the reference design.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let mut inner = self.inner.lock().map_err(|_| Error::LockPoisoned)?;
        inner.writer.flush()?;
        read_at(&inner.file, buf, offset)?;
        Ok(buf.len())
    }

    /// Current logical size of the store in bytes, including unflushed
    /// buffered writes.
    pub fn size(&self) -> Result<u64> {
        let inner = self.inner.lock().map_err(|_| Error::LockPoisoned)?;
        Ok(inner.size)
    }

    /// Flushes buffered writes and closes the underlying file.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| Error::LockPoisoned)?;
        inner.writer.flush()?;
        Ok(())
    }

    /// Returns an independent file handle positioned at the start of the
    /// store, for sequential whole-file reads (see
    /// [`crate::log::Log::reader`]). Flushes buffered writes first so the
    /// returned handle observes everything written so far.
    pub(crate) fn open_reader(&self) -> Result<File> {
        let mut inner = self.inner.lock().map_err(|_| Error::LockPoisoned)?;
        inner.writer.flush()?;
        let mut file = inner.file.try_clone()?;
        file.seek(SeekFrom::Start(0))?;
        Ok(file)
    }
}

/// Positional read that does not disturb the file's shared cursor.
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        file.read_exact_at(buf, offset)
    }
    #[cfg(not(unix))]
    {
        let mut file = file.try_clone()?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }
}
