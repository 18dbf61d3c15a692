//! Prelude module for common re-exports.
//!
//! ```rust
//! use col_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ColConfig, ConfigError, ConfigLoader, LogLevel, SessionSettings, SharedConfig, SimulatorConfig,
};

// ─── Launcher ───────────────────────────────────────────────────────
pub use crate::launcher::{LaunchError, Launcher, ProcessStatus};

// ─── Shared Memory Wire Format ──────────────────────────────────────
pub use crate::shm::layout::{LAYOUT, ShmLayout, shm_size_bytes};
pub use crate::shm::records::{
    ActionAxes, ActionRecord, CameraBlockHeader, GlobalHeader, HyperParams, HyperState,
};
pub use crate::shm::streams::{StreamFlags, StreamLabel};
