//! Property tests over randomized record sequences and segment sizes.

use commit_log::{Config, Log, SegmentConfig};
use proptest::prelude::*;
use tempfile::tempdir;

fn arb_records() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..40)
}

proptest! {
    /// Offsets are dense and strictly increasing from `InitialOffset`, and
    /// every appended record reads back exactly as written, regardless of
    /// how small the segment caps are.
    #[test]
    fn round_trip_and_monotonic_offsets(
        records in arb_records(),
        max_store_bytes in 16u64..128,
        max_index_bytes in 12u64..96,
        initial_offset in 0u64..1_000,
    ) {
        let dir = tempdir().unwrap();
        let config = Config {
            initial_offset,
            segment: SegmentConfig { max_store_bytes, max_index_bytes },
        };
        let log = Log::open(dir.path(), config).unwrap();

        let mut offsets = Vec::with_capacity(records.len());
        for record in &records {
            offsets.push(log.append(record).unwrap());
        }

        prop_assert_eq!(offsets[0], initial_offset);
        for pair in offsets.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        for (offset, record) in offsets.iter().zip(&records) {
            prop_assert_eq!(&log.read(*offset).unwrap(), record);
        }
        prop_assert_eq!(log.highest_offset().unwrap(), *offsets.last().unwrap());
    }

    /// Durability: whatever was appended before a close/reopen cycle reads
    /// back identically afterwards, and the next append continues the
    /// offset sequence without a gap.
    #[test]
    fn round_trip_survives_close_and_reopen(
        records in arb_records(),
        max_store_bytes in 16u64..128,
        max_index_bytes in 12u64..96,
    ) {
        let dir = tempdir().unwrap();
        let config = Config {
            initial_offset: 0,
            segment: SegmentConfig { max_store_bytes, max_index_bytes },
        };

        let offsets = {
            let log = Log::open(dir.path(), config).unwrap();
            let offsets: Vec<u64> = records.iter().map(|r| log.append(r).unwrap()).collect();
            log.close().unwrap();
            offsets
        };

        let log = Log::open(dir.path(), config).unwrap();
        for (offset, record) in offsets.iter().zip(&records) {
            prop_assert_eq!(&log.read(*offset).unwrap(), record);
        }

        let next = log.append(b"continuation").unwrap();
        prop_assert_eq!(next, offsets.last().unwrap() + 1);
    }
}
