//! Shared wire types for the city simulation mirror.
//!
//! This crate contains pure data structures with no synchronization logic.
//! It describes what the remote simulation server sends: one snapshot per
//! simulation step, listing every car, transit vehicle and pedestrian.

pub mod kind;
pub mod snapshot;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

// Re-export kind types
pub use kind::{AgentKind, Facing, UnknownKind};

// Re-export snapshot types
pub use snapshot::{AgentId, AgentSnapshot, GridSize, StepSnapshot};
