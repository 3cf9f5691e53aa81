//! Visualization layer: Bevy host for the city sync core.

pub mod agents;
pub mod debug;
pub mod plugin;
pub mod sync_runner;
pub mod world;

pub use plugin::CityVizPlugin;
pub use sync_runner::{SyncEvent, SyncRunner, SyncSet};
