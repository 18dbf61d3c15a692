//! # COL Shared Memory Transport
//!
//! Control-side access to the single shared-memory segment a simulator
//! creates at startup. Frames, configuration and actions all pass through
//! the same fixed-layout region; there are no sockets and no per-message
//! allocation.
//!
//! ## Segment Map
//!
//! ```text
//! 0x0000  ┌──────────────────────────┐
//!         │ Global header (48)       │  frame index, camera count, pose
//! 0x0030  ├──────────────────────────┤
//!         │ Action (20)              │  control ──► simulator, overwrite
//! 0x0044  ├──────────────────────────┤
//!         │ Hyperparameters (84)     │  state word + configuration record
//! 0x0098  ├──────────────────────────┤
//!         │ Log (256) │ Func (4)     │
//!         │ Args (2048)              │
//! 0x099C  ├──────────────────────────┤
//!         │ Camera block 0           │  16-byte header + 2048×2048×4 pixels
//!         │ Camera block 1..3        │
//!         └──────────────────────────┘
//! ```
//!
//! ## Session Flow
//!
//! ```rust,no_run
//! use col::shm::records::{ActionAxes, HyperParams};
//! use col_shared_memory::{ActionChannel, ConfigHandshake, FrameDecoder, Segment};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut segment = Segment::acquire("paris3d_ipc", Some(Duration::from_secs(30)))?;
//!
//! let params = HyperParams { rgb: 1, image_width: 128, image_height: 128, ..Default::default() };
//! let mut handshake = ConfigHandshake::default();
//! handshake.wait_ready(&segment)?;
//! handshake.configure(&mut segment, &params)?;
//!
//! let decoder = FrameDecoder::from_hyper(*segment.layout(), &params);
//! let mut actions = ActionChannel::new();
//! actions.publish(&mut segment, ActionAxes { forward: 1, ..Default::default() })?;
//! let frames = decoder.decode(&segment)?;
//! println!("{} frames", frames.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust,no_run
//! use col_shared_memory::{Segment, ShmError};
//! use std::time::Duration;
//!
//! match Segment::acquire("paris3d_ipc", Some(Duration::from_secs(1))) {
//!     Ok(segment) => { /* use segment */ }
//!     Err(ShmError::NotFound { name }) => {
//!         eprintln!("Segment '{}' not found - is the simulator running?", name);
//!     }
//!     Err(e) => eprintln!("Unexpected error: {}", e),
//! }
//! ```
//!
//! ## Thread Safety
//!
//! - **Segment**: one owner; writes take `&mut self`
//! - **FrameSet**: borrows the segment, so no write can happen while views are alive

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod error;
pub mod frames;
pub mod handshake;
pub mod platform;
pub mod poll;
pub mod segment;

pub use action::ActionChannel;
pub use error::{ShmError, ShmResult};
pub use frames::{Frame, FrameDecoder, FrameSet};
pub use handshake::{ConfigHandshake, HandshakeReport, HandshakeTiming};
pub use poll::Deadline;
pub use segment::Segment;

/// Initialize tracing for tests and tools that have no subscriber of their own
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
