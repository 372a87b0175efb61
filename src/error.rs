//! Error types for the commit log.

use thiserror::Error;

/// Errors produced by the store, index, segment, and log layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Any unhandled filesystem, mmap, or sync failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller asked for an offset the log does not currently have.
    ///
    /// Kept as a distinct variant (rather than an `Io` error) so that a
    /// transport layer built on top of this crate can map it to a
    /// not-found response without string-matching an I/O error.
    #[error("offset {offset} out of range [{lowest}, {highest}]")]
    OffsetOutOfRange {
        offset: u64,
        lowest: u64,
        highest: u64,
    },

    /// The active segment has reached its configured size limit.
    ///
    /// Internal signal between `Index`/`Store` and `Segment`/`Log` during
    /// rollover; not expected to escape `Log::append` under correct use.
    #[error("segment is full")]
    SegmentFull,

    /// The index has no entry at the requested row.
    ///
    /// Index-row-space analogue of `OffsetOutOfRange`; only ever produced
    /// and consumed internally by `Index`/`Segment`.
    #[error("end of index")]
    EndOfIndex,

    /// A `Mutex`/`RwLock` guarding store or log state was poisoned by a
    /// panic in another thread while it was held.
    #[error("lock poisoned")]
    LockPoisoned,
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, Error>;
