//! Simulator process launcher.
//!
//! Spawns the simulator with its standard command line and ties its
//! lifetime to this process: on Linux the child gets `SIGTERM` when the
//! parent dies, and [`Launcher::close`] escalates from `SIGTERM` to
//! `SIGKILL` after a grace period.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::Duration;

use col_common::config::SimulatorConfig;
use col_common::launcher::{LaunchError, Launcher, ProcessStatus};
use col_shared_memory::Deadline;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

/// Interval between liveness checks while waiting for the child to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Standard simulator arguments: windowed 100×100, log file under
/// `log_dir`, optional batch mode, then `extra`.
pub fn launch_args(log_dir: &Path, batch_mode: bool, extra: &[String]) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-screen-fullscreen",
        "0",
        "-screen-width",
        "100",
        "-screen-height",
        "100",
        "-logFile",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(log_dir.join("logs.log").into_os_string());
    if batch_mode {
        args.push("-batchmode".into());
    }
    args.extend(extra.iter().map(OsString::from));
    args
}

/// A simulator child process.
#[derive(Debug)]
pub struct SimulatorProcess {
    program: PathBuf,
    args: Vec<OsString>,
    child: Option<Child>,
}

impl SimulatorProcess {
    /// Process running `program` with exactly `args`.
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            child: None,
        }
    }

    /// Process for the configured executable, or `None` when the
    /// configuration attaches to an already running simulator.
    pub fn from_config(config: &SimulatorConfig) -> Option<Self> {
        let program = config.executable.as_ref()?;
        Some(Self::new(
            program,
            launch_args(&config.log_dir, config.batch_mode, &config.extra_args),
        ))
    }

    /// Executable path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command-line arguments.
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Pid of the running child.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);

        #[cfg(target_os = "linux")]
        {
            use std::os::unix::process::CommandExt;

            // SAFETY: runs in the forked child before exec and only makes
            // async-signal-safe syscalls.
            unsafe {
                command.pre_exec(|| {
                    nix::sys::prctl::set_pdeathsig(Signal::SIGTERM)?;
                    // Parent already gone; the death signal will never come.
                    if nix::unistd::getppid() == Pid::from_raw(1) {
                        return Err(std::io::Error::other("parent process exited before exec"));
                    }
                    Ok(())
                });
            }
        }

        command
    }

    fn wait_for_exit(child: &mut Child, grace: Duration) -> Result<bool, LaunchError> {
        let deadline = Deadline::start(Some(grace));
        loop {
            if child
                .try_wait()
                .map_err(|e| LaunchError::Other(e.to_string()))?
                .is_some()
            {
                return Ok(true);
            }
            if deadline.expired() {
                return Ok(false);
            }
            deadline.sleep(EXIT_POLL_INTERVAL);
        }
    }
}

impl Launcher for SimulatorProcess {
    fn launch(&mut self) -> Result<u32, LaunchError> {
        if let ProcessStatus::Running { pid } = self.status() {
            return Err(LaunchError::AlreadyRunning { pid });
        }

        let child = self
            .command()
            .spawn()
            .map_err(|e| LaunchError::SpawnFailed {
                program: self.program.display().to_string(),
                reason: e.to_string(),
            })?;
        let pid = child.id();
        info!("Launched simulator {} (pid {})", self.program.display(), pid);
        debug!("Simulator arguments: {:?}", self.args);

        self.child = Some(child);
        Ok(pid)
    }

    fn status(&mut self) -> ProcessStatus {
        let Some(child) = self.child.as_mut() else {
            return ProcessStatus::NotStarted;
        };
        match child.try_wait() {
            Ok(None) => ProcessStatus::Running { pid: child.id() },
            Ok(Some(status)) => ProcessStatus::Exited {
                exit_code: status.code(),
            },
            Err(e) => {
                warn!("Cannot query simulator pid {}: {}", child.id(), e);
                ProcessStatus::Exited { exit_code: None }
            }
        }
    }

    fn close(&mut self, grace: Duration) -> Result<(), LaunchError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let pid = child.id();

        if child
            .try_wait()
            .map_err(|e| LaunchError::Other(e.to_string()))?
            .is_some()
        {
            debug!("Simulator pid {} already exited", pid);
            return Ok(());
        }

        info!("Stopping simulator pid {}", pid);
        kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
            .map_err(|e| LaunchError::Other(format!("SIGTERM to pid {pid}: {e}")))?;

        if Self::wait_for_exit(&mut child, grace)? {
            info!("Simulator pid {} exited", pid);
            return Ok(());
        }

        warn!("Simulator pid {} ignored SIGTERM for {:?}, killing", pid, grace);
        child
            .kill()
            .and_then(|_| child.wait())
            .map_err(|_| LaunchError::ShutdownFailed { pid, grace })?;
        Ok(())
    }
}

impl Drop for SimulatorProcess {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take()
            && matches!(child.try_wait(), Ok(None))
        {
            warn!("Simulator pid {} still running on drop, killing", child.id());
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
