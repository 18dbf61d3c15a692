//! Configuration loading and settings translation.
//!
//! A COL configuration file has three tables:
//!
//! ```toml
//! [shared]
//! log_level = "debug"
//! service_name = "col-trainer-01"
//!
//! [simulator]
//! executable = "/opt/paris3d/Paris3D.x86_64"
//! log_dir = "/tmp/paris3d"
//! batch_mode = true
//!
//! [session]
//! number_of_steps = 1000
//! rgb_camera = true
//! depth_camera = true
//! img_size = 128
//! ```
//!
//! `[session]` is the user-facing view of the hyperparameter record; it is
//! translated into [`HyperParams`] with [`SessionSettings::to_hyper`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::consts::{
    DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_CONFIGURE_TIMEOUT, DEFAULT_READY_TIMEOUT,
    DEFAULT_SEGMENT_NAME, DEFAULT_SHUTDOWN_GRACE,
};
use crate::shm::layout::MAX_RESOLUTION;
use crate::shm::records::HyperParams;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across COL applications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Simulator process / segment settings ───────────────────────────

/// How to reach the simulator and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Simulator executable. `None` attaches to an already running simulator.
    pub executable: Option<PathBuf>,
    /// Directory receiving the simulator's `logs.log`.
    pub log_dir: PathBuf,
    /// Run the simulator without its interactive UI.
    pub batch_mode: bool,
    /// Extra arguments appended to the launch command line.
    pub extra_args: Vec<String>,
    /// Shared-memory object name.
    pub segment_name: String,
    /// Seconds to wait for the segment to appear; `"never"` waits forever.
    #[serde(with = "wait_secs")]
    pub acquire_timeout_s: Option<f64>,
    /// Seconds to wait for the simulator to report ready; `"never"` waits forever.
    #[serde(with = "wait_secs")]
    pub ready_timeout_s: Option<f64>,
    /// Seconds to wait for the configuration acknowledgment; `"never"`
    /// waits forever.
    #[serde(with = "wait_secs")]
    pub configure_timeout_s: Option<f64>,
    /// Seconds between SIGTERM and SIGKILL on close.
    pub shutdown_grace_s: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            executable: None,
            log_dir: std::env::temp_dir(),
            batch_mode: false,
            extra_args: Vec::new(),
            segment_name: DEFAULT_SEGMENT_NAME.to_string(),
            acquire_timeout_s: Some(DEFAULT_ACQUIRE_TIMEOUT.as_secs_f64()),
            ready_timeout_s: Some(DEFAULT_READY_TIMEOUT.as_secs_f64()),
            configure_timeout_s: Some(DEFAULT_CONFIGURE_TIMEOUT.as_secs_f64()),
            shutdown_grace_s: DEFAULT_SHUTDOWN_GRACE.as_secs_f64(),
        }
    }
}

impl SimulatorConfig {
    /// Segment acquisition timeout. `None` waits forever.
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_s.map(secs)
    }

    /// Readiness timeout. `None` waits forever.
    pub fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout_s.map(secs)
    }

    /// Handshake acknowledgment timeout. `None` waits forever.
    pub fn configure_timeout(&self) -> Option<Duration> {
        self.configure_timeout_s.map(secs)
    }

    /// Grace period before force-killing the simulator.
    pub fn shutdown_grace(&self) -> Duration {
        secs(self.shutdown_grace_s)
    }

    /// Validate names and timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_name.is_empty() || self.segment_name.contains('/') {
            return Err(ConfigError::ValidationError(format!(
                "invalid segment_name {:?}",
                self.segment_name
            )));
        }
        for (name, value) in [
            ("acquire_timeout_s", self.acquire_timeout_s),
            ("ready_timeout_s", self.ready_timeout_s),
            ("configure_timeout_s", self.configure_timeout_s),
            ("shutdown_grace_s", Some(self.shutdown_grace_s)),
        ] {
            let Some(value) = value else { continue };
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        Ok(())
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Wait timeouts in TOML: a number of seconds, or `"never"` for no limit.
mod wait_secs {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    const NEVER: &str = "never";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Secs(f64),
        Word(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(secs) => serializer.serialize_f64(*secs),
            None => serializer.serialize_str(NEVER),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Secs(secs) => Ok(Some(secs)),
            Repr::Word(word) if word == NEVER => Ok(None),
            Repr::Word(word) => Err(D::Error::custom(format!(
                "expected seconds or \"{NEVER}\", got {word:?}"
            ))),
        }
    }
}

// ─── Session settings ───────────────────────────────────────────────

/// User-facing session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Global simulation speed multiplier.
    pub speed_factor: f32,
    /// Spawn pedestrians.
    pub spawn_pedestrians: bool,
    /// Spawn cars.
    pub spawn_cars: bool,
    /// Forward movement speed.
    pub move_speed: f32,
    /// Turn speed.
    pub turn_speed: f32,
    /// Vertical speed.
    pub vertical_speed: f32,
    /// Movement momentum.
    pub momentum: f32,
    /// Fixed physics timestep in seconds.
    #[serde(alias = "fixedDeltaTime")]
    pub fixed_delta_time: f32,
    /// Step budget of the session.
    pub number_of_steps: u32,
    /// Enable the RGB camera.
    pub rgb_camera: bool,
    /// Enable the depth camera.
    pub depth_camera: bool,
    /// Enable the normals camera.
    pub normals_camera: bool,
    /// Enable the semantic camera.
    pub semantic_camera: bool,
    /// Square image side in pixels.
    #[serde(alias = "IMG_SIZE")]
    pub img_size: u32,
    /// Vertical field of view in degrees.
    pub vertical_fov: f32,
    /// Spawn position x.
    pub start_x: f32,
    /// Spawn position y.
    pub start_y: f32,
    /// Spawn position z.
    pub start_z: f32,
    /// Start the streaming server.
    pub launch_streaming: bool,
    /// Render to screen.
    pub render: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            speed_factor: 1.0,
            spawn_pedestrians: false,
            spawn_cars: false,
            move_speed: 1.0,
            turn_speed: 1.0,
            vertical_speed: 1.0,
            momentum: 0.0,
            fixed_delta_time: 0.02,
            number_of_steps: 1000,
            rgb_camera: true,
            depth_camera: false,
            normals_camera: false,
            semantic_camera: false,
            img_size: 128,
            vertical_fov: 60.0,
            start_x: 0.0,
            start_y: 0.0,
            start_z: 0.0,
            launch_streaming: false,
            render: true,
        }
    }
}

impl SessionSettings {
    /// Validate ranges the simulator cannot handle.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.img_size == 0 || self.img_size as usize > MAX_RESOLUTION {
            return Err(ConfigError::ValidationError(format!(
                "img_size must be in 1..={MAX_RESOLUTION}, got {}",
                self.img_size
            )));
        }
        if !(self.fixed_delta_time.is_finite() && self.fixed_delta_time > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "fixed_delta_time must be positive, got {}",
                self.fixed_delta_time
            )));
        }
        Ok(())
    }

    /// Translate into the flat wire record. `img_size` sets both image sides.
    pub fn to_hyper(&self) -> HyperParams {
        HyperParams {
            speed_factor: self.speed_factor,
            spawn_pedestrians: self.spawn_pedestrians as u32,
            spawn_cars: self.spawn_cars as u32,
            move_speed: self.move_speed,
            turn_speed: self.turn_speed,
            vertical_speed: self.vertical_speed,
            momentum: self.momentum,
            fixed_delta_time: self.fixed_delta_time,
            n_actions: self.number_of_steps,
            rgb: self.rgb_camera as u32,
            depth: self.depth_camera as u32,
            normals: self.normals_camera as u32,
            semantic: self.semantic_camera as u32,
            launch_streaming: self.launch_streaming as u32,
            render: self.render as u32,
            image_width: self.img_size,
            image_height: self.img_size,
            vertical_fov: self.vertical_fov,
            start_x: self.start_x,
            start_y: self.start_y,
            start_z: self.start_z,
        }
    }
}

impl From<&SessionSettings> for HyperParams {
    fn from(settings: &SessionSettings) -> Self {
        settings.to_hyper()
    }
}

// ─── Top-level file ─────────────────────────────────────────────────

/// Complete COL configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColConfig {
    /// Logging and identity.
    pub shared: SharedConfig,
    /// Simulator process and segment settings.
    #[serde(default)]
    pub simulator: SimulatorConfig,
    /// Session hyperparameters.
    #[serde(default)]
    pub session: SessionSettings,
}

impl ColConfig {
    /// Load and validate a configuration file.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Validate every table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.simulator.validate()?;
        self.session.validate()
    }
}
