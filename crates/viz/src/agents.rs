//! Agent rendering: one mesh per live agent, posed from the sync core.

use bevy::prelude::*;
use std::collections::HashMap;

use city_events::{AgentId, AgentKind};
use city_sync::Variant;

use crate::sync_runner::{SyncRunner, SyncSet};

/// Plugin for agent rendering.
pub struct AgentPlugin;

impl Plugin for AgentPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AgentEntities>()
            .init_resource::<AgentAssets>()
            .add_systems(
                Update,
                (spawn_new_agents, apply_agent_poses).chain().after(SyncSet),
            );
    }
}

/// Component for visual representation of an agent.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualAgent {
    pub kind: AgentKind,
    pub id: AgentId,
}

/// Resource mapping agents to their entities.
///
/// Ids are only unique within a kind, so the key is the pair.
#[derive(Resource, Default)]
pub struct AgentEntities {
    pub map: HashMap<(AgentKind, AgentId), Entity>,
}

impl AgentEntities {
    /// Get the entity for an agent.
    pub fn get(&self, kind: AgentKind, id: AgentId) -> Option<Entity> {
        self.map.get(&(kind, id)).copied()
    }

    pub fn insert(&mut self, kind: AgentKind, id: AgentId, entity: Entity) {
        self.map.insert((kind, id), entity);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Mesh and material shared by every agent of one variant.
#[derive(Resource, Default)]
pub struct AgentAssets {
    by_variant: HashMap<String, (Handle<Mesh>, Handle<StandardMaterial>)>,
}

/// How an agent is drawn: box size (width, height, length) and linear color.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentShape {
    pub key: String,
    pub size: [f32; 3],
    pub color: [f32; 3],
}

impl AgentShape {
    /// Shape for an agent, falling back to a plain box when no variant was
    /// configured for its kind.
    pub fn for_agent(kind: AgentKind, variant: Option<&Variant>) -> Self {
        match variant {
            Some(variant) => Self {
                key: variant.name.clone(),
                size: variant.size,
                color: variant.color,
            },
            None => {
                let size = match kind {
                    AgentKind::Car => [4.0, 3.0, 8.0],
                    AgentKind::TransitVehicle => [5.0, 6.0, 18.0],
                    AgentKind::Pedestrian => [1.5, 4.0, 1.5],
                };
                Self {
                    key: format!("default-{}", kind.as_str()),
                    size,
                    color: [0.6, 0.6, 0.6],
                }
            }
        }
    }
}

/// Spawns an entity for every registry instance that has none yet.
fn spawn_new_agents(
    mut commands: Commands,
    mut runner: ResMut<SyncRunner>,
    mut agent_entities: ResMut<AgentEntities>,
    mut assets: ResMut<AgentAssets>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let registry = runner.manager().registry();
    if registry.total() == agent_entities.len() {
        return;
    }

    for instance in registry.iter() {
        let (kind, id) = (instance.kind(), instance.id());
        if agent_entities.get(kind, id).is_some() {
            continue;
        }

        let shape = AgentShape::for_agent(kind, instance.variant());
        let (mesh, material) = assets
            .by_variant
            .entry(shape.key.clone())
            .or_insert_with(|| {
                let [w, h, l] = shape.size;
                let [r, g, b] = shape.color;
                (
                    meshes.add(Cuboid::new(w, h, l)),
                    materials.add(StandardMaterial {
                        base_color: Color::linear_rgb(r, g, b),
                        perceptual_roughness: 0.8,
                        ..default()
                    }),
                )
            })
            .clone();

        let entity = commands
            .spawn((
                PbrBundle {
                    mesh,
                    material,
                    transform: Transform::from_translation(instance.position())
                        .with_rotation(instance.orientation()),
                    ..default()
                },
                VisualAgent { kind, id },
                Name::new(format!("{} {}", kind, id)),
            ))
            .id();
        agent_entities.insert(kind, id, entity);
    }

    tracing::debug!("Rendering {} agents", agent_entities.len());
}

/// Copies each agent's pose from the registry into its transform.
fn apply_agent_poses(
    mut runner: ResMut<SyncRunner>,
    mut agents: Query<(&VisualAgent, &mut Transform)>,
) {
    let registry = runner.manager().registry();
    for (agent, mut transform) in agents.iter_mut() {
        if let Some(instance) = registry.get(agent.kind, agent.id) {
            transform.translation = instance.position();
            transform.rotation = instance.orientation();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_entities_keyed_by_kind() {
        let mut entities = AgentEntities::default();
        assert!(entities.is_empty());

        entities.insert(AgentKind::Car, 1, Entity::from_raw(10));
        entities.insert(AgentKind::Pedestrian, 1, Entity::from_raw(11));

        assert_eq!(entities.len(), 2);
        assert_eq!(entities.get(AgentKind::Car, 1), Some(Entity::from_raw(10)));
        assert_eq!(
            entities.get(AgentKind::Pedestrian, 1),
            Some(Entity::from_raw(11))
        );
        assert_eq!(entities.get(AgentKind::TransitVehicle, 1), None);
    }

    #[test]
    fn test_shape_from_variant() {
        let variant = Variant {
            name: "taxi".into(),
            color: [0.95, 0.8, 0.1],
            size: [4.0, 3.0, 8.0],
        };
        let shape = AgentShape::for_agent(AgentKind::Car, Some(&variant));
        assert_eq!(shape.key, "taxi");
        assert_eq!(shape.color, [0.95, 0.8, 0.1]);
    }

    #[test]
    fn test_shape_fallback_per_kind() {
        let bus = AgentShape::for_agent(AgentKind::TransitVehicle, None);
        let walker = AgentShape::for_agent(AgentKind::Pedestrian, None);
        assert_ne!(bus.key, walker.key);
        assert!(bus.size[2] > walker.size[2]);
    }
}
