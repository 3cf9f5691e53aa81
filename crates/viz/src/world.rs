//! World rendering: ground plane, lighting, and the overview camera.
//!
//! The ground covers the simulation grid in render space. Its size is only
//! known once a snapshot reports the grid, so it starts at a default extent
//! and is refitted when the reported grid changes.

use bevy::pbr::light_consts;
use bevy::prelude::*;

use city_events::GridSize;
use city_sync::CoordinateTransform;

use crate::sync_runner::{SyncRunner, SyncSet};

/// Grid assumed until the server reports one.
pub const DEFAULT_GRID: GridSize = GridSize(36, 36);

/// Plugin for world/scene rendering.
pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<VisualWorld>()
            .add_systems(Startup, setup_scene)
            .add_systems(Update, fit_world_to_grid.after(SyncSet));
    }
}

/// The grid currently framed by the ground and camera.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct VisualWorld {
    pub grid_size: GridSize,
    /// Ground size in render units.
    pub extent: Vec2,
}

impl Default for VisualWorld {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID,
            extent: CoordinateTransform::default().render_extent(DEFAULT_GRID),
        }
    }
}

impl VisualWorld {
    /// Center of the ground in render space.
    pub fn center(&self) -> Vec3 {
        Vec3::new(self.extent.x / 2.0, 0.0, self.extent.y / 2.0)
    }
}

/// Marker for the ground plane.
#[derive(Component)]
pub struct Ground;

/// Marker for the main camera.
#[derive(Component)]
pub struct MainCamera;

/// Camera placement that keeps the whole ground in view.
pub fn overview_transform(world: &VisualWorld) -> Transform {
    let center = world.center();
    let span = world.extent.max_element().max(1.0);
    Transform::from_xyz(center.x, span * 0.9, center.z + span * 0.75)
        .looking_at(center, Vec3::Y)
}

/// Ground plane transform: the plane mesh is unit-sized and scaled to fit.
fn ground_transform(world: &VisualWorld) -> Transform {
    Transform::from_translation(world.center())
        .with_scale(Vec3::new(world.extent.x, 1.0, world.extent.y))
}

/// System to set up the ground, light, and camera.
fn setup_scene(
    mut commands: Commands,
    world: Res<VisualWorld>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Plane3d::default().mesh().size(1.0, 1.0)),
            material: materials.add(StandardMaterial {
                base_color: Color::srgb(0.25, 0.27, 0.3), // Asphalt grey
                perceptual_roughness: 1.0,
                ..default()
            }),
            transform: ground_transform(&world),
            ..default()
        },
        Ground,
    ));

    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: light_consts::lux::OVERCAST_DAY,
            shadows_enabled: true,
            ..default()
        },
        transform: Transform::from_xyz(0.0, 100.0, 0.0)
            .looking_at(Vec3::new(0.4, 0.0, 0.8), Vec3::Y),
        ..default()
    });

    commands.spawn((
        Camera3dBundle {
            transform: overview_transform(&world),
            ..default()
        },
        MainCamera,
    ));

    tracing::info!(
        "Spawned scene for a {}x{} grid",
        world.grid_size.width(),
        world.grid_size.height()
    );
}

/// Refits ground and camera when the reported grid or scale changes.
fn fit_world_to_grid(
    mut runner: ResMut<SyncRunner>,
    mut world: ResMut<VisualWorld>,
    mut ground: Query<&mut Transform, (With<Ground>, Without<MainCamera>)>,
    mut camera: Query<&mut Transform, (With<MainCamera>, Without<Ground>)>,
) {
    let manager = runner.manager();
    let grid_size = manager.grid_size().unwrap_or(world.grid_size);
    let extent = manager.registry().transform().render_extent(grid_size);
    if grid_size == world.grid_size && extent == world.extent {
        return;
    }

    world.grid_size = grid_size;
    world.extent = extent;

    for mut transform in ground.iter_mut() {
        *transform = ground_transform(&world);
    }
    for mut transform in camera.iter_mut() {
        *transform = overview_transform(&world);
    }

    tracing::info!(
        "Fitted world to {}x{} grid ({:.0}x{:.0} units)",
        grid_size.width(),
        grid_size.height(),
        extent.x,
        extent.y
    );
}
