//! Parametrized edge cases around the offset-range boundary.

use commit_log::{Config, Error, Log, SegmentConfig};
use test_case::test_case;

fn seeded_log(dir: &std::path::Path) -> Log {
    let config = Config {
        initial_offset: 10,
        segment: SegmentConfig {
            max_store_bytes: 1024,
            max_index_bytes: 1024,
        },
    };
    let log = Log::open(dir, config).unwrap();
    for payload in ["a", "b", "c"] {
        log.append(payload.as_bytes()).unwrap();
    }
    // offsets 10, 11, 12 now hold "a", "b", "c".
    log
}

#[test_case(9, false; "one below lowest")]
#[test_case(10, true; "at lowest")]
#[test_case(12, true; "at highest")]
#[test_case(13, false; "one above highest")]
fn offset_range_boundary(offset: u64, should_succeed: bool) {
    let dir = tempfile::tempdir().unwrap();
    let log = seeded_log(dir.path());

    match log.read(offset) {
        Ok(_) => assert!(should_succeed, "offset {offset} unexpectedly readable"),
        Err(Error::OffsetOutOfRange { offset: got, .. }) => {
            assert!(!should_succeed, "offset {offset} unexpectedly out of range");
            assert_eq!(got, offset);
        }
        Err(other) => panic!("unexpected error at offset {offset}: {other}"),
    }
}
