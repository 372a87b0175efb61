//! A durable, append-only commit log with segmented store/index files and
//! offset-addressed reads.
//!
//! A [`Log`] is a directory of segments, each pairing a [`store::Store`]
//! (raw, length-prefixed payloads) with an [`index::Index`] (a dense,
//! memory-mapped table mapping a segment-relative offset to a byte
//! position in the store). Appends always go to the last segment; once it
//! is "maxed" (store or index at its configured size cap) a new active
//! segment is opened. Reads are addressed by a monotonically increasing
//! global offset and are routed to whichever segment currently contains
//! it.
//!
//! ```no_run
//! use commit_log::{Config, Log};
//!
//! # fn main() -> Result<(), commit_log::Error> {
//! let log = Log::open("/tmp/my-log", Config::default())?;
//! let offset = log.append(b"hello")?;
//! assert_eq!(log.read(offset)?, b"hello");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod index;
mod log;
mod segment;
mod store;

pub use config::{Config, SegmentConfig, DEFAULT_MAX_INDEX_BYTES, DEFAULT_MAX_STORE_BYTES};
pub use error::{Error, Result};
pub use log::Log;
