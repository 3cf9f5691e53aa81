//! Engine-free synchronization core for the city simulation mirror.
//!
//! A remote server owns the simulation; this crate keeps a local, smoothly
//! animated copy of it. Each agent steers toward the position the last
//! snapshot reported, and the next snapshot is requested only once the
//! agents have caught up on average.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   StepSnapshot   ┌─────────────┐   poses   ┌──────────┐
//! │ simulation │ ───────────────▶ │ SyncManager │ ────────▶ │   host   │
//! │   server   │ ◀─────────────── │  + registry │           │ renderer │
//! └────────────┘   init / step    └─────────────┘           └──────────┘
//! ```
//!
//! # Modules
//!
//! - [`client`]: The [`SimulationClient`] seam and its HTTP implementation
//! - [`registry`]: Live agent instances keyed by kind and id
//! - [`motion`]: Rate-limited steering toward targets
//! - [`transform`]: Grid to render-space mapping
//! - [`variants`]: Visual prototype pools
//! - [`sync`]: The convergence-gated poll loop
//! - [`config`]: TOML configuration

pub mod client;
pub mod config;
pub mod error;
pub mod motion;
pub mod registry;
pub mod sync;
pub mod transform;
pub mod variants;

// Re-export client types
pub use client::{HttpSimulationClient, SimulationClient};

// Re-export config types
pub use config::{
    MotionConfig, PollConfig, ServerConfig, SyncConfig, TransformConfig, Tuning, VariantEntry,
    VariantsConfig,
};

// Re-export error types
pub use error::{ConfigError, FetchError, RegistryError, SyncError};

// Re-export motion types
pub use motion::{look_rotation, rotate_towards, MotionController, MotionState};

// Re-export registry types
pub use registry::{AgentInstance, AgentRegistry};

// Re-export sync types
pub use sync::{converged, FetchKind, SyncManager, SyncState, SyncStats, TickReport};

pub use transform::CoordinateTransform;
pub use variants::{Variant, VariantPool, VariantProvider};
