//! # Launcher Trait
//!
//! Contract for the simulator process lifecycle. The `col` binary
//! implements it to spawn the simulator, check whether it is still alive,
//! and close it when the session ends.
//!
//! The trait stays thin: how the process is started (direct spawn,
//! container, remote host) is left to the implementation.

use std::time::Duration;

/// Liveness reported by [`Launcher::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Process was never launched or has already been reaped.
    NotStarted,
    /// Process is running.
    Running {
        /// OS process id.
        pid: u32,
    },
    /// Process has exited.
    Exited {
        /// Exit code if the process exited normally.
        exit_code: Option<i32>,
    },
}

/// Error type for launcher operations.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// Failed to spawn the simulator.
    #[error("failed to spawn {program}: {reason}")]
    SpawnFailed {
        /// Executable that failed to start.
        program: String,
        /// OS-level reason.
        reason: String,
    },

    /// A simulator is already running under this launcher.
    #[error("simulator already running (pid {pid})")]
    AlreadyRunning {
        /// Pid of the running simulator.
        pid: u32,
    },

    /// Process did not exit after SIGTERM and SIGKILL.
    #[error("simulator pid {pid} did not exit within {grace:?}")]
    ShutdownFailed {
        /// Pid of the stuck process.
        pid: u32,
        /// Grace period that elapsed.
        grace: Duration,
    },

    /// Generic I/O or system error.
    #[error("launcher error: {0}")]
    Other(String),
}

/// Lifecycle contract for the simulator process.
///
/// Implementations must guarantee that the simulator receives a
/// termination signal if the control process dies, and that
/// [`Launcher::close`] either completes within the grace period or
/// force-kills the process.
pub trait Launcher {
    /// Spawn the simulator. Returns its OS pid.
    fn launch(&mut self) -> Result<u32, LaunchError>;

    /// Current liveness of the simulator.
    fn status(&mut self) -> ProcessStatus;

    /// Terminate the simulator: SIGTERM, wait up to `grace`, then SIGKILL.
    /// Closing a launcher with no running process is a no-op.
    fn close(&mut self, grace: Duration) -> Result<(), LaunchError>;
}
