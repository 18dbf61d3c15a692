//! COL Common Library
//!
//! Shared definitions for the control side of the simulator link: the
//! shared-memory layout, the little-endian wire records written into it,
//! session settings and the launcher contract.
//!
//! # Module Structure
//!
//! - [`shm`] - Segment layout, wire records and stream flags
//! - [`config`] - TOML configuration loading and settings translation
//! - [`launcher`] - Simulator process lifecycle contract
//! - [`consts`] - Default names and timings
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use col_common::shm::layout::{LAYOUT, shm_size_bytes};
//!
//! assert_eq!(LAYOUT.total_size(), shm_size_bytes());
//! ```

pub mod config;
pub mod consts;
pub mod launcher;
pub mod prelude;
pub mod shm;
