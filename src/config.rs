//! Tunables for segments and the log that owns them.

/// Default cap on a segment's store size, in bytes.
pub const DEFAULT_MAX_STORE_BYTES: u64 = 1024;

/// Default cap on a segment's index size, in bytes.
pub const DEFAULT_MAX_INDEX_BYTES: u64 = 1024;

/// Per-segment size limits.
///
/// A zero value for either field means "use the default" — see
/// [`SegmentConfig::normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentConfig {
    /// Store rolls over once its size reaches this many bytes.
    pub max_store_bytes: u64,
    /// Store rolls over once the index reaches this many bytes.
    pub max_index_bytes: u64,
}

impl SegmentConfig {
    /// Returns a copy with zero fields replaced by their documented defaults.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            max_store_bytes: if self.max_store_bytes == 0 {
                DEFAULT_MAX_STORE_BYTES
            } else {
                self.max_store_bytes
            },
            max_index_bytes: if self.max_index_bytes == 0 {
                DEFAULT_MAX_INDEX_BYTES
            } else {
                self.max_index_bytes
            },
        }
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: DEFAULT_MAX_STORE_BYTES,
            max_index_bytes: DEFAULT_MAX_INDEX_BYTES,
        }
    }
}

/// Configuration for a [`crate::log::Log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    /// Offset assigned to the first record of a freshly created log.
    pub initial_offset: u64,
    /// Per-segment size limits.
    pub segment: SegmentConfig,
}

impl Config {
    /// Creates a config with the given initial offset and default segment limits.
    #[must_use]
    pub fn with_initial_offset(initial_offset: u64) -> Self {
        Self {
            initial_offset,
            segment: SegmentConfig::default(),
        }
    }

    /// Returns a copy with zero-valued segment limits replaced by their defaults.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            initial_offset: self.initial_offset,
            segment: self.segment.normalized(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_segment_config_normalizes_to_defaults() {
        let cfg = SegmentConfig {
            max_store_bytes: 0,
            max_index_bytes: 0,
        }
        .normalized();
        assert_eq!(cfg.max_store_bytes, DEFAULT_MAX_STORE_BYTES);
        assert_eq!(cfg.max_index_bytes, DEFAULT_MAX_INDEX_BYTES);
    }

    #[test]
    fn nonzero_segment_config_is_preserved() {
        let cfg = SegmentConfig {
            max_store_bytes: 32,
            max_index_bytes: 24,
        }
        .normalized();
        assert_eq!(cfg.max_store_bytes, 32);
        assert_eq!(cfg.max_index_bytes, 24);
    }
}
