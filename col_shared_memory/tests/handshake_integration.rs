//! Configuration handshake between two mappings of the same segment file

use std::thread;
use std::time::{Duration, Instant};

use col::shm::records::{HyperParams, HyperState};
use col_shared_memory::{ConfigHandshake, HandshakeTiming, Segment, ShmError, ShmResult, init_tracing};

fn timing(ack_timeout: Duration) -> HandshakeTiming {
    HandshakeTiming {
        ready_interval: Duration::from_millis(1),
        ready_timeout: Some(Duration::from_millis(200)),
        retry_interval: Duration::from_millis(10),
        ack_timeout: Some(ack_timeout),
    }
}

fn params() -> HyperParams {
    HyperParams {
        fixed_delta_time: 0.02,
        n_actions: 5,
        rgb: 1,
        depth: 1,
        image_width: 128,
        image_height: 96,
        ..Default::default()
    }
}

#[test]
fn test_simulator_acknowledges_configuration() -> ShmResult<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("paris3d_ipc");

    let mut simulator = Segment::create_path(&path)?;
    let mut control = Segment::acquire_path(&path, Some(Duration::from_secs(1)))?;

    let sim = thread::spawn(move || -> ShmResult<HyperParams> {
        let hyper = simulator.layout().hyper_offset();
        let deadline = Instant::now() + Duration::from_secs(5);
        while simulator.load_u32_acquire(hyper)? != HyperState::Pending.as_u32() {
            assert!(Instant::now() < deadline, "control never published");
            thread::sleep(Duration::from_millis(1));
        }
        let received = ConfigHandshake::read_params(&simulator)?;
        simulator.store_u32_release(hyper, HyperState::Acknowledged.as_u32())?;
        Ok(received)
    });

    let mut handshake = ConfigHandshake::new(timing(Duration::from_secs(5)));
    assert!(handshake.wait_ready(&control)?);
    let report = handshake.configure(&mut control, &params())?;

    let received = sim.join().unwrap()?;
    assert_eq!(received, params());
    assert!(report.publishes >= 1);
    assert!(handshake.is_complete());
    assert_eq!(
        ConfigHandshake::state(&control)?,
        Some(HyperState::Acknowledged)
    );
    Ok(())
}

#[test]
fn test_stuck_pending_times_out() -> ShmResult<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("paris3d_ipc");

    let _simulator = Segment::create_path(&path)?;
    let mut control = Segment::acquire_path(&path, Some(Duration::from_secs(1)))?;

    let ack_timeout = Duration::from_millis(200);
    let mut handshake = ConfigHandshake::new(timing(ack_timeout));
    let started = Instant::now();
    let err = handshake.configure(&mut control, &params()).unwrap_err();

    match err {
        ShmError::Timeout {
            operation,
            elapsed,
            attempts,
        } => {
            assert_eq!(operation, "configuration acknowledgment");
            assert!(elapsed >= ack_timeout);
            // At least one publish per elapsed retry interval, minus the first.
            let retry = timing(ack_timeout).retry_interval;
            let expected = (ack_timeout.as_millis() / retry.as_millis() - 1) as u32;
            assert!(attempts >= expected, "only {attempts} publishes, expected {expected}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!handshake.is_complete());
    assert_eq!(ConfigHandshake::state(&control)?, Some(HyperState::Pending));
    Ok(())
}

#[test]
fn test_late_acknowledgment_within_timeout() -> ShmResult<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("paris3d_ipc");

    let mut simulator = Segment::create_path(&path)?;
    let mut control = Segment::acquire_path(&path, None)?;

    // Simulator misses the first publishes, then acknowledges.
    let sim = thread::spawn(move || -> ShmResult<()> {
        thread::sleep(Duration::from_millis(80));
        let hyper = simulator.layout().hyper_offset();
        simulator.store_u32_release(hyper, HyperState::Acknowledged.as_u32())
    });

    let mut handshake = ConfigHandshake::new(timing(Duration::from_secs(5)));
    let report = handshake.configure(&mut control, &params())?;
    sim.join().unwrap()?;

    assert!(report.publishes > 1);
    assert!(report.elapsed >= Duration::from_millis(70));
    assert_eq!(ConfigHandshake::state_word(&control)?, 2);
    Ok(())
}
