//! Per-agent steering toward the current target.
//!
//! Agents never jump to a new snapshot position. Each frame the heading is
//! turned toward the target by at most `rotation_rate * dt` radians and the
//! agent moves `speed * dt` along that new heading, so vehicles arc through
//! turns the way a car would. A step never covers more than the remaining
//! distance, so long frames land on the target instead of overshooting it.

use bevy_math::{Mat3, Quat, Vec3};

use crate::registry::AgentInstance;

/// Default distance at or below which an agent stops moving.
pub const DEFAULT_ARRIVAL_THRESHOLD: f32 = 0.9;

/// Whether an agent is still travelling toward its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Moving,
    Arrived,
}

/// Advances agents toward their targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionController {
    pub arrival_threshold: f32,
}

impl Default for MotionController {
    fn default() -> Self {
        Self {
            arrival_threshold: DEFAULT_ARRIVAL_THRESHOLD,
        }
    }
}

impl MotionController {
    pub fn new(arrival_threshold: f32) -> Self {
        Self { arrival_threshold }
    }

    /// Classifies an agent without moving it.
    pub fn state_of(&self, agent: &AgentInstance) -> MotionState {
        let distance = agent.distance_to_target();
        if distance <= self.arrival_threshold || distance <= f32::EPSILON {
            MotionState::Arrived
        } else {
            MotionState::Moving
        }
    }

    /// Moves one agent by a single frame of `dt` seconds.
    pub fn advance(&self, agent: &mut AgentInstance, dt: f32) -> MotionState {
        if self.state_of(agent) == MotionState::Arrived {
            return MotionState::Arrived;
        }

        let displacement = agent.target - agent.position;
        let distance = displacement.length();
        let desired = displacement / distance;
        let direction = rotate_towards(agent.forward(), desired, agent.rotation_rate * dt);

        agent.orientation = look_rotation(direction);
        agent.position += direction * (agent.speed * dt).min(distance);

        MotionState::Moving
    }
}

/// Turns `from` toward `to` by at most `max_angle` radians.
///
/// Both inputs are expected to be unit vectors. Exactly opposite vectors
/// turn about the world up axis.
pub fn rotate_towards(from: Vec3, to: Vec3, max_angle: f32) -> Vec3 {
    if max_angle <= 0.0 {
        return from;
    }

    let angle = from.angle_between(to);
    if angle <= max_angle {
        return to;
    }

    let axis = from.cross(to);
    let axis = if axis.length_squared() > 1e-12 {
        axis.normalize()
    } else if from.cross(Vec3::Y).length_squared() > 1e-12 {
        Vec3::Y
    } else {
        from.any_orthonormal_vector()
    };

    (Quat::from_axis_angle(axis, max_angle) * from).normalize()
}

/// Rotation whose local `+Z` points along `forward` with `+Y` kept as close
/// to world up as possible. A zero vector yields the identity.
pub fn look_rotation(forward: Vec3) -> Quat {
    let forward = forward.normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }

    let right = Vec3::Y.cross(forward);
    if right.length_squared() <= 1e-12 {
        // Looking straight up or down
        return Quat::from_rotation_arc(Vec3::Z, forward);
    }
    let right = right.normalize();
    let up = forward.cross(right);

    Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize()
}
