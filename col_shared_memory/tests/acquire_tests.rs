//! Segment acquisition against a file that may not exist yet

use std::thread;
use std::time::{Duration, Instant};

use col::shm::layout::LAYOUT;
use col_shared_memory::{Segment, ShmError, ShmResult};

#[test]
fn test_missing_segment_reports_not_found_after_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never_created");

    let started = Instant::now();
    let err = Segment::acquire_path(&path, Some(Duration::from_secs(1))).unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, ShmError::NotFound { .. }));
    assert!(elapsed >= Duration::from_secs(1), "gave up after {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1200), "gave up after {elapsed:?}");
}

#[test]
fn test_segment_created_while_waiting() -> ShmResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("late");

    let creator_path = path.clone();
    let creator = thread::spawn(move || -> ShmResult<Segment> {
        thread::sleep(Duration::from_millis(250));
        Segment::create_path(&creator_path)
    });

    let segment = Segment::acquire_path(&path, Some(Duration::from_secs(5)))?;
    let _simulator = creator.join().unwrap()?;

    assert_eq!(segment.len(), LAYOUT.total_size());
    assert_eq!(segment.name(), path.display().to_string());
    Ok(())
}

#[test]
fn test_both_mappings_see_the_same_bytes() -> ShmResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("shared");

    let mut simulator = Segment::create_path(&path)?;
    let control = Segment::acquire_path(&path, Some(Duration::ZERO))?;

    simulator.write_u32(0, 1234)?;
    assert_eq!(control.read_u32(0)?, 1234);
    Ok(())
}
