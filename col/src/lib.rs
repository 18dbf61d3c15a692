//! # COL Control Driver
//!
//! Process-level pieces of the control side: launching and stopping the
//! simulator, and driving one session over the shared-memory link.
//!
//! ```rust,no_run
//! use col::{Session, SimulatorProcess};
//! use col_common::config::ColConfig;
//! use col_common::launcher::Launcher;
//! use col_common::shm::records::ActionAxes;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ColConfig::load_validated(Path::new("config/col.toml"))?;
//! let launcher = SimulatorProcess::from_config(&config.simulator)
//!     .map(|p| Box::new(p) as Box<dyn Launcher>);
//! let mut session = Session::new(config, launcher);
//! let summary = session.run(None, ActionAxes { forward: 1, ..Default::default() })?;
//! println!("{} steps", summary.steps);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod launcher;
pub mod session;

pub use launcher::{SimulatorProcess, launch_args};
pub use session::{Session, SessionError, SessionSummary};
