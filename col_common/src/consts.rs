//! System-wide defaults for the COL workspace.
//!
//! Single source of truth for default names and polling timings.
//! Layout constants live in [`crate::shm::layout`].

use std::time::Duration;

/// Default name of the shared-memory object created by the simulator.
pub const DEFAULT_SEGMENT_NAME: &str = "paris3d_ipc";

/// Directory where POSIX shared-memory objects appear as files.
pub const SHM_DIR: &str = "/dev/shm";

/// Poll interval while waiting for the segment to appear.
pub const ACQUIRE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default time to wait for the segment to appear.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval of the readiness check.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default time to wait for the simulator to report `Ready`.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(3);

/// Re-publish interval of the configuration handshake.
pub const CONFIGURE_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Default time to wait for the configuration acknowledgment.
pub const DEFAULT_CONFIGURE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default grace period between SIGTERM and SIGKILL when closing the simulator.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_intervals_shorter_than_timeouts() {
        assert!(ACQUIRE_POLL_INTERVAL < DEFAULT_ACQUIRE_TIMEOUT);
        assert!(READY_POLL_INTERVAL < DEFAULT_READY_TIMEOUT);
        assert!(CONFIGURE_RETRY_INTERVAL < DEFAULT_CONFIGURE_TIMEOUT);
    }

    #[test]
    fn segment_name_is_not_a_path() {
        assert!(!DEFAULT_SEGMENT_NAME.contains('/'));
    }
}
