//! Session driver.
//!
//! One session is: optionally launch the simulator, acquire the segment,
//! wait for readiness, deliver the configuration, then tick (publish an
//! action, decode the frames) until the step budget runs out or the
//! running flag is cleared.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use col_common::config::{ColConfig, ConfigError};
use col_common::launcher::{LaunchError, Launcher};
use col_common::shm::records::{ActionAxes, HyperParams};
use col_shared_memory::{
    ActionChannel, ConfigHandshake, Deadline, FrameDecoder, HandshakeReport, HandshakeTiming,
    Segment, ShmError, ShmResult,
};
use tracing::{debug, info, warn};

/// Longest startup wait between two checks of the running flag.
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Simulator process could not be started or stopped.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// Shared-memory transport failure.
    #[error(transparent)]
    Shm(#[from] ShmError),

    /// The running flag was cleared during a startup wait.
    #[error("interrupted during {during}")]
    Interrupted {
        /// Wait that was cut short.
        during: &'static str,
    },
}

/// What a finished session did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Handshake outcome.
    pub handshake: Option<HandshakeReport>,
    /// Actions published.
    pub steps: u32,
    /// Frames decoded across all ticks.
    pub frames: usize,
    /// Frame index of the last global header read.
    pub last_frame_index: u32,
    /// Whether the running flag stopped the session early.
    pub interrupted: bool,
}

/// Control-side session.
pub struct Session {
    config: ColConfig,
    launcher: Option<Box<dyn Launcher>>,
    running: Arc<AtomicBool>,
}

impl Session {
    /// Session for `config`. `launcher` is `None` to attach to a simulator
    /// that is already running.
    pub fn new(config: ColConfig, launcher: Option<Box<dyn Launcher>>) -> Self {
        Self {
            config,
            launcher,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag polled between ticks and during startup waits; clear it to stop
    /// the session.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Configuration in use.
    pub fn config(&self) -> &ColConfig {
        &self.config
    }

    fn timing(&self) -> HandshakeTiming {
        HandshakeTiming {
            ready_timeout: self.config.simulator.ready_timeout(),
            ack_timeout: self.config.simulator.configure_timeout(),
            ..Default::default()
        }
    }

    fn tick_period(&self) -> Duration {
        Duration::try_from_secs_f32(self.config.session.fixed_delta_time).unwrap_or(Duration::ZERO)
    }

    /// Attach to the segment, configure the simulator and run `steps` ticks
    /// publishing `axes` each tick. `None` steps uses the configured budget.
    ///
    /// A launched simulator is closed before returning, also on error. A
    /// session error takes precedence over a failure to close.
    pub fn run(&mut self, steps: Option<u32>, axes: ActionAxes) -> Result<SessionSummary, SessionError> {
        if let Some(launcher) = self.launcher.as_mut() {
            launcher.launch()?;
        }

        let result = match self.drive(steps, axes) {
            Err(SessionError::Interrupted { during }) => {
                info!("Interrupted during {}", during);
                Ok(SessionSummary {
                    interrupted: true,
                    ..Default::default()
                })
            }
            other => other,
        };

        let grace = self.config.simulator.shutdown_grace();
        let closed = match self.launcher.as_mut() {
            Some(launcher) => launcher.close(grace),
            None => Ok(()),
        };

        match (result, closed) {
            (Err(e), Err(close_err)) => {
                warn!("Failed to close simulator after session error: {}", close_err);
                Err(e)
            }
            (Ok(_), Err(close_err)) => Err(close_err.into()),
            (result, Ok(())) => result,
        }
    }

    /// Run a blocking wait in slices of at most [`CANCEL_CHECK_INTERVAL`],
    /// checking the running flag before each. `attempt` gets the slice length
    /// and returns `None` when the slice ran out.
    fn wait_in_slices<T>(
        &self,
        during: &'static str,
        timeout: Option<Duration>,
        mut attempt: impl FnMut(Duration) -> ShmResult<Option<T>>,
    ) -> Result<Option<T>, SessionError> {
        let deadline = Deadline::start(timeout);
        loop {
            if !self.running.load(Ordering::SeqCst) {
                return Err(SessionError::Interrupted { during });
            }
            let slice = deadline
                .remaining()
                .map_or(CANCEL_CHECK_INTERVAL, |r| r.min(CANCEL_CHECK_INTERVAL));
            if let Some(value) = attempt(slice)? {
                return Ok(Some(value));
            }
            if deadline.expired() {
                return Ok(None);
            }
        }
    }

    fn drive(&self, steps: Option<u32>, axes: ActionAxes) -> Result<SessionSummary, SessionError> {
        let sim = &self.config.simulator;
        let name = sim.segment_name.as_str();
        let mut segment = self
            .wait_in_slices("segment acquisition", sim.acquire_timeout(), |slice| {
                match Segment::acquire(name, Some(slice)) {
                    Ok(segment) => Ok(Some(segment)),
                    Err(ShmError::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e),
                }
            })?
            .ok_or_else(|| ShmError::NotFound {
                name: name.to_string(),
            })?;

        let params: HyperParams = self.config.session.to_hyper();
        let timing = self.timing();
        let mut handshake = ConfigHandshake::new(timing);

        let ready = self.wait_in_slices("simulator readiness", timing.ready_timeout, |slice| {
            Ok(handshake.wait_ready_within(&segment, Some(slice))?.then_some(()))
        })?;
        if ready.is_none() {
            warn!(
                "Simulator not ready after {:?}, sending configuration anyway",
                timing.ready_timeout
            );
        }

        let started = Instant::now();
        let mut publishes = 0u32;
        let last = self
            .wait_in_slices("configuration acknowledgment", timing.ack_timeout, |slice| {
                match handshake.configure_within(&mut segment, &params, Some(slice)) {
                    Ok(report) => Ok(Some(report)),
                    Err(ShmError::Timeout { attempts, .. }) => {
                        publishes += attempts;
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            })?
            .ok_or_else(|| ShmError::Timeout {
                operation: "configuration acknowledgment",
                elapsed: started.elapsed(),
                attempts: publishes,
            })?;
        let report = HandshakeReport {
            elapsed: started.elapsed(),
            publishes: publishes + last.publishes,
        };

        let mut summary = SessionSummary {
            handshake: Some(report),
            ..Default::default()
        };
        self.tick_loop(
            &mut segment,
            &params,
            steps.unwrap_or(self.config.session.number_of_steps),
            axes,
            &mut summary,
        )?;
        Ok(summary)
    }

    fn tick_loop(
        &self,
        segment: &mut Segment,
        params: &HyperParams,
        steps: u32,
        axes: ActionAxes,
        summary: &mut SessionSummary,
    ) -> Result<(), ShmError> {
        let decoder = FrameDecoder::from_hyper(*segment.layout(), params);
        let mut actions = ActionChannel::new();
        let period = self.tick_period();

        info!("Running {} steps, streams {:?}", steps, decoder.streams());
        for _ in 0..steps {
            if !self.running.load(Ordering::SeqCst) {
                info!("Stopping after {} steps", summary.steps);
                summary.interrupted = true;
                break;
            }
            let started = Instant::now();

            let record = actions.publish(segment, axes)?;
            summary.steps += 1;

            match decoder.decode(segment) {
                Ok(frames) => {
                    summary.frames += frames.len();
                    summary.last_frame_index = frames.header.frame_index;
                    debug!(
                        "Step {}: frame {} with {} images at {:?}",
                        record.index,
                        frames.header.frame_index,
                        frames.len(),
                        frames.header.position
                    );
                }
                Err(e) if e.is_retryable() => warn!("Step {}: {}", record.index, e),
                Err(e) => return Err(e),
            }

            if let Some(rest) = period.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
        Ok(())
    }
}
