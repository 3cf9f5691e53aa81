//! Configuration loading for the sync core.
//!
//! All settings are loaded from a TOML configuration file. Every section is
//! optional and missing values fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use city_events::AgentKind;

use crate::error::ConfigError;

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote simulation server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Per-agent steering parameters
    #[serde(default)]
    pub motion: MotionConfig,
    /// Convergence-gated polling settings
    #[serde(default)]
    pub sync: PollConfig,
    /// Grid to render-space mapping
    #[serde(default)]
    pub transform: TransformConfig,
    /// Visual variant pools
    #[serde(default)]
    pub variants: VariantsConfig,
}

impl SyncConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Returns this configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The host-tunable subset of this configuration.
    pub fn tuning(&self) -> Tuning {
        Tuning {
            speed: self.motion.speed,
            rotation_rate: self.motion.rotation_rate,
            pedestrian_speed_factor: self.motion.pedestrian_speed_factor,
            tolerance: self.sync.tolerance,
            scale_factor: self.transform.scale_factor,
        }
    }
}

/// Remote simulation server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL, without a trailing slash
    pub base_url: String,
    /// Route for the init call; `/{cars}/{pedestrians}` is appended
    pub init_path: String,
    /// Route for the step call
    pub step_path: String,
    /// Deadline for a single fetch
    pub request_timeout_ms: u64,
    /// Number of cars requested at init
    pub cars: u32,
    /// Number of pedestrians requested at init
    pub pedestrians: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".into(),
            init_path: "/init".into(),
            step_path: "/data/0".into(),
            request_timeout_ms: 5000,
            cars: 1,
            pedestrians: 1,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Steering parameters shared by every agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Vehicle speed in render units per second
    pub speed: f32,
    /// Maximum turn rate in radians per second
    pub rotation_rate: f32,
    /// Pedestrians move at `speed / pedestrian_speed_factor`
    pub pedestrian_speed_factor: f32,
    /// Distance at or below which an agent counts as arrived
    pub arrival_threshold: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed: 20.0,
            rotation_rate: 100.0,
            pedestrian_speed_factor: 4.0,
            arrival_threshold: 0.9,
        }
    }
}

impl MotionConfig {
    /// Effective speed for an agent of the given kind.
    pub fn speed_for(&self, kind: AgentKind) -> f32 {
        match kind {
            AgentKind::Pedestrian => self.speed / self.pedestrian_speed_factor,
            AgentKind::Car | AgentKind::TransitVehicle => self.speed,
        }
    }
}

/// Convergence-gated polling settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Mean distance-to-target below which the next step is fetched
    pub tolerance: f32,
    /// Seconds to wait after a failed step fetch before polling again
    pub failure_cooldown_secs: f32,
    /// Re-issue a failed init after this many seconds; never when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_retry_secs: Option<f32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            tolerance: 1.0,
            failure_cooldown_secs: 1.0,
            init_retry_secs: None,
        }
    }
}

/// Grid to render-space mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Render units per grid cell on both horizontal axes
    pub scale_factor: f32,
    /// Height of cars and transit vehicles
    pub vehicle_elevation: f32,
    /// Height of pedestrians
    pub pedestrian_elevation: f32,
    /// Initial heading for agents reported as Up or Unknown
    pub default_facing: [f32; 3],
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            scale_factor: 10.0,
            vehicle_elevation: 2.0,
            pedestrian_elevation: 8.0,
            default_facing: [0.0, 0.0, 1.0],
        }
    }
}

/// Visual variant pools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantsConfig {
    /// Seed for the variant picker
    pub seed: u64,
    /// Prototypes, each tagged with an agent kind code
    pub pool: Vec<VariantEntry>,
}

impl Default for VariantsConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            pool: vec![
                VariantEntry::new(0, "sedan", [0.75, 0.15, 0.15], [4.0, 3.0, 8.0]),
                VariantEntry::new(0, "taxi", [0.95, 0.8, 0.1], [4.0, 3.0, 8.0]),
                VariantEntry::new(0, "van", [0.9, 0.9, 0.9], [4.5, 4.5, 9.0]),
                VariantEntry::new(1, "metrobus", [0.8, 0.1, 0.1], [5.0, 6.0, 18.0]),
                VariantEntry::new(2, "walker", [0.2, 0.4, 0.85], [1.5, 4.0, 1.5]),
                VariantEntry::new(2, "runner", [0.2, 0.7, 0.3], [1.5, 4.0, 1.5]),
            ],
        }
    }
}

/// One renderable prototype in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantEntry {
    /// Agent kind code (0 car, 1 transit vehicle, 2 pedestrian)
    pub kind: i64,
    pub name: String,
    /// Linear RGB
    pub color: [f32; 3],
    /// Bounding box in render units (width, height, length)
    pub size: [f32; 3],
}

impl VariantEntry {
    pub fn new(kind: i64, name: &str, color: [f32; 3], size: [f32; 3]) -> Self {
        Self {
            kind,
            name: name.into(),
            color,
            size,
        }
    }
}

/// Parameters the rendering host may retune at runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub speed: f32,
    pub rotation_rate: f32,
    pub pedestrian_speed_factor: f32,
    pub tolerance: f32,
    pub scale_factor: f32,
}
