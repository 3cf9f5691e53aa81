//! Grid to render-space mapping.

use bevy_math::{Vec2, Vec3};
use city_events::{AgentKind, GridSize};

use crate::config::TransformConfig;

/// Maps logical grid cells to render-space positions.
///
/// Grid `x` becomes render `x`, grid `y` becomes render `z`, both scaled by
/// `scale_factor`. Render `y` is a fixed height per agent kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransform {
    pub scale_factor: f32,
    pub vehicle_elevation: f32,
    pub pedestrian_elevation: f32,
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self::from(&TransformConfig::default())
    }
}

impl From<&TransformConfig> for CoordinateTransform {
    fn from(config: &TransformConfig) -> Self {
        Self {
            scale_factor: config.scale_factor,
            vehicle_elevation: config.vehicle_elevation,
            pedestrian_elevation: config.pedestrian_elevation,
        }
    }
}

impl CoordinateTransform {
    pub fn to_render_space(&self, grid_x: f32, grid_y: f32, kind: AgentKind) -> Vec3 {
        Vec3::new(
            grid_x * self.scale_factor,
            self.elevation(kind),
            grid_y * self.scale_factor,
        )
    }

    /// Spawn and target height for an agent kind.
    pub fn elevation(&self, kind: AgentKind) -> f32 {
        if kind.is_vehicle() {
            self.vehicle_elevation
        } else {
            self.pedestrian_elevation
        }
    }

    /// Width and depth of the whole grid in render units.
    pub fn render_extent(&self, grid: GridSize) -> Vec2 {
        Vec2::new(
            grid.width() as f32 * self.scale_factor,
            grid.height() as f32 * self.scale_factor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_scaling() {
        let transform = CoordinateTransform::default();
        for &(x, y) in &[(0.0, 0.0), (1.0, 1.0), (3.5, 12.0), (-2.0, 7.25)] {
            let p = transform.to_render_space(x, y, AgentKind::Car);
            assert_eq!(p, Vec3::new(x * 10.0, 2.0, y * 10.0));
        }
    }

    #[test]
    fn test_elevation_by_kind() {
        let transform = CoordinateTransform::default();
        assert_eq!(transform.to_render_space(1.0, 2.0, AgentKind::Car).y, 2.0);
        assert_eq!(
            transform.to_render_space(1.0, 2.0, AgentKind::TransitVehicle).y,
            2.0
        );
        assert_eq!(
            transform.to_render_space(1.0, 2.0, AgentKind::Pedestrian),
            Vec3::new(10.0, 8.0, 20.0)
        );
    }

    #[test]
    fn test_custom_factor() {
        let transform = CoordinateTransform {
            scale_factor: 4.0,
            vehicle_elevation: 0.0,
            pedestrian_elevation: 1.0,
        };
        assert_eq!(
            transform.to_render_space(2.0, 3.0, AgentKind::Pedestrian),
            Vec3::new(8.0, 1.0, 12.0)
        );
    }

    #[test]
    fn test_render_extent() {
        let transform = CoordinateTransform::default();
        assert_eq!(transform.render_extent(GridSize(36, 20)), Vec2::new(360.0, 200.0));
    }
}
