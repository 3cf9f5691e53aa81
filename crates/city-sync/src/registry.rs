//! Id-keyed registry of live agent instances.
//!
//! One map per agent kind. Instances enter through [`AgentRegistry::create`]
//! and are only ever touched again through [`AgentRegistry::update`]; an
//! update for an id that was never created is a protocol violation, not a
//! cue to spawn. Nothing is ever removed.

use bevy_math::{Quat, Vec3};
use std::collections::HashMap;

use city_events::{AgentId, AgentKind, AgentSnapshot, Facing};

use crate::config::{MotionConfig, SyncConfig};
use crate::error::RegistryError;
use crate::motion::{look_rotation, MotionController, MotionState};
use crate::transform::CoordinateTransform;
use crate::variants::{Variant, VariantPool, VariantProvider};

/// A live agent as the client sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentInstance {
    pub(crate) id: AgentId,
    pub(crate) kind: AgentKind,
    pub(crate) position: Vec3,
    pub(crate) orientation: Quat,
    pub(crate) speed: f32,
    /// Radians per second
    pub(crate) rotation_rate: f32,
    pub(crate) target: Vec3,
    pub(crate) variant: Option<Variant>,
}

impl AgentInstance {
    /// A stationary instance whose target is its own position.
    pub fn new(id: AgentId, kind: AgentKind, position: Vec3, forward: Vec3) -> Self {
        Self {
            id,
            kind,
            position,
            orientation: look_rotation(forward),
            speed: 0.0,
            rotation_rate: 0.0,
            target: position,
            variant: None,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn rotation_rate(&self) -> f32 {
        self.rotation_rate
    }

    pub fn variant(&self) -> Option<&Variant> {
        self.variant.as_ref()
    }

    /// Unit vector the agent is facing (local `+Z`).
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::Z
    }

    pub fn distance_to_target(&self) -> f32 {
        self.position.distance(self.target)
    }
}

/// Owns every live [`AgentInstance`], partitioned by kind.
pub struct AgentRegistry {
    cars: HashMap<AgentId, AgentInstance>,
    transit_vehicles: HashMap<AgentId, AgentInstance>,
    pedestrians: HashMap<AgentId, AgentInstance>,
    transform: CoordinateTransform,
    motion: MotionConfig,
    default_facing: Vec3,
    variants: Box<dyn VariantProvider>,
}

impl AgentRegistry {
    pub fn new(
        transform: CoordinateTransform,
        motion: MotionConfig,
        default_facing: Vec3,
        variants: Box<dyn VariantProvider>,
    ) -> Self {
        Self {
            cars: HashMap::new(),
            transit_vehicles: HashMap::new(),
            pedestrians: HashMap::new(),
            transform,
            motion,
            default_facing,
            variants,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            CoordinateTransform::from(&config.transform),
            config.motion,
            Vec3::from_array(config.transform.default_facing),
            Box::new(VariantPool::from_config(&config.variants)),
        )
    }

    fn map(&self, kind: AgentKind) -> &HashMap<AgentId, AgentInstance> {
        match kind {
            AgentKind::Car => &self.cars,
            AgentKind::TransitVehicle => &self.transit_vehicles,
            AgentKind::Pedestrian => &self.pedestrians,
        }
    }

    fn map_mut(&mut self, kind: AgentKind) -> &mut HashMap<AgentId, AgentInstance> {
        match kind {
            AgentKind::Car => &mut self.cars,
            AgentKind::TransitVehicle => &mut self.transit_vehicles,
            AgentKind::Pedestrian => &mut self.pedestrians,
        }
    }

    /// Initial heading for a reported facing.
    pub fn facing_direction(&self, facing: Facing) -> Vec3 {
        match facing {
            Facing::Right => Vec3::X,
            Facing::Left => Vec3::NEG_X,
            Facing::Down => Vec3::NEG_Z,
            Facing::Up | Facing::Unknown => self.default_facing,
        }
    }

    /// Spawns a new instance at the snapshot's position.
    pub fn create(
        &mut self,
        kind: AgentKind,
        snapshot: &AgentSnapshot,
    ) -> Result<AgentId, RegistryError> {
        if self.contains(kind, snapshot.id) {
            return Err(RegistryError::DuplicateId {
                kind,
                id: snapshot.id,
            });
        }

        let position = self
            .transform
            .to_render_space(snapshot.grid_x, snapshot.grid_y, kind);
        let forward = self.facing_direction(snapshot.facing);

        let mut instance = AgentInstance::new(snapshot.id, kind, position, forward);
        instance.speed = self.motion.speed_for(kind);
        instance.rotation_rate = self.motion.rotation_rate;
        instance.variant = self.variants.pick(kind);

        tracing::debug!(
            "Created {} {} at {:?} ({})",
            kind,
            snapshot.id,
            position,
            instance
                .variant
                .as_ref()
                .map_or("no variant", |v| v.name.as_str())
        );

        self.map_mut(kind).insert(snapshot.id, instance);
        Ok(snapshot.id)
    }

    /// Points an existing instance at the snapshot's position and refreshes
    /// its motion parameters.
    pub fn update(&mut self, kind: AgentKind, snapshot: &AgentSnapshot) -> Result<(), RegistryError> {
        let target = self
            .transform
            .to_render_space(snapshot.grid_x, snapshot.grid_y, kind);
        let speed = self.motion.speed_for(kind);
        let rotation_rate = self.motion.rotation_rate;

        let instance = self
            .map_mut(kind)
            .get_mut(&snapshot.id)
            .ok_or(RegistryError::UnknownId {
                kind,
                id: snapshot.id,
            })?;

        instance.target = target;
        instance.speed = speed;
        instance.rotation_rate = rotation_rate;
        Ok(())
    }

    pub fn get(&self, kind: AgentKind, id: AgentId) -> Option<&AgentInstance> {
        self.map(kind).get(&id)
    }

    pub fn contains(&self, kind: AgentKind, id: AgentId) -> bool {
        self.map(kind).contains_key(&id)
    }

    pub fn for_each(&self, kind: AgentKind, f: impl FnMut(&AgentInstance)) {
        self.map(kind).values().for_each(f);
    }

    pub fn for_each_mut(&mut self, kind: AgentKind, f: impl FnMut(&mut AgentInstance)) {
        self.map_mut(kind).values_mut().for_each(f);
    }

    /// Every instance across all kinds.
    pub fn iter(&self) -> impl Iterator<Item = &AgentInstance> {
        self.cars
            .values()
            .chain(self.transit_vehicles.values())
            .chain(self.pedestrians.values())
    }

    pub fn len(&self, kind: AgentKind) -> usize {
        self.map(kind).len()
    }

    pub fn total(&self) -> usize {
        self.cars.len() + self.transit_vehicles.len() + self.pedestrians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Average distance-to-target over every instance; `0.0` when empty.
    pub fn mean_distance(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let sum: f32 = self.iter().map(AgentInstance::distance_to_target).sum();
        sum / total as f32
    }

    /// Steps every instance by `dt`. Returns how many are still moving.
    pub fn advance_all(&mut self, controller: &MotionController, dt: f32) -> usize {
        let mut moving = 0;
        for kind in AgentKind::ALL {
            self.for_each_mut(kind, |instance| {
                if controller.advance(instance, dt) == MotionState::Moving {
                    moving += 1;
                }
            });
        }
        moving
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    pub fn motion(&self) -> &MotionConfig {
        &self.motion
    }

    /// Replaces the motion parameters used by later creates and updates.
    pub fn set_motion(&mut self, motion: MotionConfig) {
        self.motion = motion;
    }

    /// Replaces the grid scale used by later creates and updates.
    pub fn set_scale_factor(&mut self, scale_factor: f32) {
        self.transform.scale_factor = scale_factor;
    }
}
