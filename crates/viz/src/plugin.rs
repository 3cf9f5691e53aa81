//! Main visualization plugin that ties all systems together.

use bevy::prelude::*;

use crate::agents::AgentPlugin;
use crate::debug::DebugPlugin;
use crate::sync_runner::SyncRunnerPlugin;
use crate::world::WorldPlugin;

/// Main plugin for the city visualization.
///
/// This plugin sets up the window and adds all sub-plugins. Rendering
/// systems are ordered after [`SyncSet`](crate::sync_runner::SyncSet).
pub struct CityVizPlugin;

impl Plugin for CityVizPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "City Simulation".into(),
                resolution: (1280., 720.).into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ClearColor(Color::srgb(0.53, 0.75, 0.9)))
        .add_plugins((SyncRunnerPlugin, WorldPlugin, AgentPlugin, DebugPlugin));
    }
}
