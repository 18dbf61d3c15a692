//! One-time configuration handshake.
//!
//! ## Protocol
//!
//! The first word of the hyperparameter zone is a state word:
//!
//! ```text
//!   control                        simulator
//!   ───────                        ─────────
//!   wait for Ready(0)
//!   write payload (+4..+88)
//!   release Pending(1)    ───────► observe Pending, apply payload
//!   poll, re-publish      ◄─────── write Acknowledged(2)
//! ```
//!
//! The payload is always written before the flag that advertises it, so a
//! simulator observing `Pending` never sees a half-written record. While
//! waiting, the control process re-publishes payload and flag on a fixed
//! interval in case the simulator's own poll missed the transition. The
//! flag is re-published with a compare-and-swap, so a concurrent
//! `Acknowledged` is never overwritten.

use std::time::Duration;

use col::consts::{
    CONFIGURE_RETRY_INTERVAL, DEFAULT_CONFIGURE_TIMEOUT, DEFAULT_READY_TIMEOUT,
    READY_POLL_INTERVAL,
};
use col::shm::records::{HyperParams, HyperState};
use tracing::{debug, info, warn};

use crate::error::{ShmError, ShmResult};
use crate::poll::Deadline;
use crate::segment::Segment;

/// Intervals and deadlines of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeTiming {
    /// Poll interval of the readiness check.
    pub ready_interval: Duration,
    /// Readiness timeout. Zero checks exactly once; `None` waits forever.
    pub ready_timeout: Option<Duration>,
    /// Re-publish interval while waiting for the acknowledgment.
    pub retry_interval: Duration,
    /// Acknowledgment timeout. `None` retries forever.
    pub ack_timeout: Option<Duration>,
}

impl Default for HandshakeTiming {
    fn default() -> Self {
        Self {
            ready_interval: READY_POLL_INTERVAL,
            ready_timeout: Some(DEFAULT_READY_TIMEOUT),
            retry_interval: CONFIGURE_RETRY_INTERVAL,
            ack_timeout: Some(DEFAULT_CONFIGURE_TIMEOUT),
        }
    }
}

/// Outcome of a successful handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeReport {
    /// Time from first publish to observed acknowledgment.
    pub elapsed: Duration,
    /// Number of times payload and flag were published.
    pub publishes: u32,
}

/// Control-side handshake state for one session.
#[derive(Debug, Clone)]
pub struct ConfigHandshake {
    timing: HandshakeTiming,
    report: Option<HandshakeReport>,
}

impl ConfigHandshake {
    /// New handshake with the given timing.
    pub fn new(timing: HandshakeTiming) -> Self {
        Self {
            timing,
            report: None,
        }
    }

    /// Timing in use.
    pub fn timing(&self) -> &HandshakeTiming {
        &self.timing
    }

    /// Report of the completed handshake, if any.
    pub fn report(&self) -> Option<HandshakeReport> {
        self.report
    }

    /// Whether the simulator acknowledged the configuration.
    pub fn is_complete(&self) -> bool {
        self.report.is_some()
    }

    /// Raw state word.
    pub fn state_word(segment: &Segment) -> ShmResult<u32> {
        segment.load_u32_acquire(segment.layout().hyper_offset())
    }

    /// Decoded state word; `None` for values outside the protocol.
    pub fn state(segment: &Segment) -> ShmResult<Option<HyperState>> {
        Ok(HyperState::from_u32(Self::state_word(segment)?))
    }

    /// Poll until the simulator reports `Ready`.
    ///
    /// Returns `false` on timeout; the simulator may still be starting, so
    /// the caller decides whether that is fatal.
    pub fn wait_ready(&self, segment: &Segment) -> ShmResult<bool> {
        self.wait_ready_within(segment, self.timing.ready_timeout)
    }

    /// [`wait_ready`](Self::wait_ready) with an explicit timeout, for
    /// callers that wait in slices.
    pub fn wait_ready_within(&self, segment: &Segment, timeout: Option<Duration>) -> ShmResult<bool> {
        let deadline = Deadline::start(timeout);
        loop {
            if Self::state(segment)? == Some(HyperState::Ready) {
                debug!("Simulator ready after {:?}", deadline.elapsed());
                return Ok(true);
            }
            if deadline.expired() {
                return Ok(false);
            }
            deadline.sleep(self.timing.ready_interval);
        }
    }

    /// Write the payload, then flag it `Pending`.
    ///
    /// Returns `true` if the simulator had already acknowledged, in which
    /// case the flag is left untouched.
    fn publish(segment: &mut Segment, payload: &[u8]) -> ShmResult<bool> {
        let hyper = segment.layout().hyper_offset();
        let payload_offset = segment.layout().hyper_payload_offset();
        segment.write(payload_offset, payload)?;

        let pending = HyperState::Pending.as_u32();
        let mut observed = Self::state_word(segment)?;
        loop {
            if observed == HyperState::Acknowledged.as_u32() {
                return Ok(true);
            }
            // Pending -> Pending still releases the payload write above.
            match segment.compare_exchange_u32(hyper, observed, pending)? {
                Ok(_) => return Ok(false),
                Err(actual) => observed = actual,
            }
        }
    }

    /// Deliver the configuration and wait for the simulator to apply it.
    ///
    /// # Errors
    /// - [`ShmError::AlreadyConfigured`] if this session already completed a handshake.
    /// - [`ShmError::Timeout`] if no acknowledgment arrived in time; the
    ///   simulator's actual state is then unknown.
    pub fn configure(
        &mut self,
        segment: &mut Segment,
        params: &HyperParams,
    ) -> ShmResult<HandshakeReport> {
        self.configure_within(segment, params, self.timing.ack_timeout)
    }

    /// [`configure`](Self::configure) with an explicit acknowledgment
    /// timeout. A timed-out attempt leaves the handshake incomplete, so it
    /// may be called again.
    pub fn configure_within(
        &mut self,
        segment: &mut Segment,
        params: &HyperParams,
        ack_timeout: Option<Duration>,
    ) -> ShmResult<HandshakeReport> {
        if self.is_complete() {
            return Err(ShmError::AlreadyConfigured);
        }

        let payload = params.encode();
        let deadline = Deadline::start(ack_timeout);
        let mut publishes = 1u32;
        let mut acknowledged = Self::publish(segment, &payload)?;
        info!("Hyperparameters sent, waiting for simulator acknowledgment");

        loop {
            if acknowledged || Self::state(segment)? == Some(HyperState::Acknowledged) {
                let report = HandshakeReport {
                    elapsed: deadline.elapsed(),
                    publishes,
                };
                info!(
                    "Simulator acknowledged hyperparameters after {:?} ({} publishes)",
                    report.elapsed, report.publishes
                );
                self.report = Some(report);
                return Ok(report);
            }

            if deadline.expired() {
                warn!(
                    "No acknowledgment after {:?} ({} publishes)",
                    deadline.elapsed(),
                    publishes
                );
                return Err(ShmError::Timeout {
                    operation: "configuration acknowledgment",
                    elapsed: deadline.elapsed(),
                    attempts: publishes,
                });
            }

            deadline.sleep_until(self.timing.retry_interval * publishes);
            acknowledged = Self::publish(segment, &payload)?;
            publishes += 1;
        }
    }

    /// Read back the payload currently in the segment.
    pub fn read_params(segment: &Segment) -> ShmResult<HyperParams> {
        let bytes = segment.read_array(segment.layout().hyper_payload_offset())?;
        Ok(HyperParams::decode(&bytes))
    }
}

impl Default for ConfigHandshake {
    fn default() -> Self {
        Self::new(HandshakeTiming::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_timing(ack_timeout: Duration) -> HandshakeTiming {
        HandshakeTiming {
            ready_interval: Duration::from_millis(1),
            ready_timeout: Some(Duration::from_millis(20)),
            retry_interval: Duration::from_millis(5),
            ack_timeout: Some(ack_timeout),
        }
    }

    #[test]
    fn fresh_segment_is_ready() {
        let seg = Segment::anonymous("hs").unwrap();
        let hs = ConfigHandshake::new(fast_timing(Duration::from_millis(50)));
        assert_eq!(ConfigHandshake::state(&seg).unwrap(), Some(HyperState::Ready));
        assert!(hs.wait_ready(&seg).unwrap());
    }

    #[test]
    fn readiness_times_out_with_false() {
        let mut seg = Segment::anonymous("hs").unwrap();
        let off = seg.layout().hyper_offset();
        seg.store_u32_release(off, HyperState::Pending.as_u32()).unwrap();

        let hs = ConfigHandshake::new(fast_timing(Duration::from_millis(50)));
        assert!(!hs.wait_ready(&seg).unwrap());
    }

    #[test]
    fn zero_ready_timeout_checks_once() {
        let seg = Segment::anonymous("hs").unwrap();
        let mut timing = fast_timing(Duration::from_millis(50));
        timing.ready_timeout = Some(Duration::ZERO);
        assert!(ConfigHandshake::new(timing).wait_ready(&seg).unwrap());
    }

    #[test]
    fn configure_writes_payload_before_pending() {
        let mut seg = Segment::anonymous("hs").unwrap();
        let params = HyperParams {
            n_actions: 77,
            rgb: 1,
            image_width: 64,
            image_height: 64,
            ..Default::default()
        };

        let mut hs = ConfigHandshake::new(fast_timing(Duration::from_millis(30)));
        let err = hs.configure(&mut seg, &params).unwrap_err();
        assert!(matches!(err, ShmError::Timeout { .. }));
        assert!(!hs.is_complete());

        assert_eq!(ConfigHandshake::state(&seg).unwrap(), Some(HyperState::Pending));
        assert_eq!(ConfigHandshake::read_params(&seg).unwrap(), params);
    }

    #[test]
    fn unbounded_ready_wait_returns_once_ready() {
        let mut seg = Segment::anonymous("hs").unwrap();
        let off = seg.layout().hyper_offset();
        seg.store_u32_release(off, HyperState::Pending.as_u32()).unwrap();

        let mut timing = fast_timing(Duration::from_millis(50));
        timing.ready_timeout = None;
        let hs = ConfigHandshake::new(timing);

        // Bounded slice first, then the open-ended wait on a ready segment.
        assert!(!hs.wait_ready_within(&seg, Some(Duration::from_millis(5))).unwrap());
        seg.store_u32_release(off, HyperState::Ready.as_u32()).unwrap();
        assert!(hs.wait_ready(&seg).unwrap());
    }

    #[test]
    fn timed_out_configure_can_be_retried() {
        let mut seg = Segment::anonymous("hs").unwrap();
        let mut hs = ConfigHandshake::new(fast_timing(Duration::from_millis(50)));
        let params = HyperParams::default();

        assert!(matches!(
            hs.configure_within(&mut seg, &params, Some(Duration::from_millis(10))),
            Err(ShmError::Timeout { .. })
        ));
        let off = seg.layout().hyper_offset();
        seg.store_u32_release(off, HyperState::Acknowledged.as_u32())
            .unwrap();
        assert!(hs.configure_within(&mut seg, &params, None).is_ok());
        assert!(hs.is_complete());
    }

    #[test]
    fn already_acknowledged_completes_on_first_publish() {
        let mut seg = Segment::anonymous("hs").unwrap();
        let off = seg.layout().hyper_offset();
        seg.store_u32_release(off, HyperState::Acknowledged.as_u32())
            .unwrap();

        let mut hs = ConfigHandshake::new(fast_timing(Duration::from_millis(30)));
        let report = hs.configure(&mut seg, &HyperParams::default()).unwrap();
        assert_eq!(report.publishes, 1);
        assert_eq!(ConfigHandshake::state_word(&seg).unwrap(), 2);

        assert!(matches!(
            hs.configure(&mut seg, &HyperParams::default()),
            Err(ShmError::AlreadyConfigured)
        ));
    }
}
