//! Integration tests for the visualization layer.

use city_events::fixtures::{init_snapshot, INIT_SNAPSHOT_JSON};
use city_events::{AgentKind, StepSnapshot};
use city_sync::{AgentRegistry, SyncConfig};
use viz::agents::AgentShape;
use viz::world::{overview_transform, VisualWorld, DEFAULT_GRID};

/// Test loading and parsing the sample init body.
#[test]
fn test_parse_sample_init() {
    let snapshot = StepSnapshot::from_json(INIT_SNAPSHOT_JSON).unwrap();
    assert_eq!(snapshot.len(), 6);
    assert_eq!(snapshot.grid_size, Some(DEFAULT_GRID));
}

/// Every agent in the sample init lands on the ground the world frames.
#[test]
fn test_sample_agents_inside_world() {
    let config = SyncConfig::default();
    let mut registry = AgentRegistry::from_config(&config);
    for (kind, agent) in init_snapshot().iter() {
        registry.create(kind, agent).unwrap();
    }

    let world = VisualWorld::default();
    for instance in registry.iter() {
        let p = instance.position();
        assert!(p.x >= 0.0 && p.x <= world.extent.x, "{:?}", p);
        assert!(p.z >= 0.0 && p.z <= world.extent.y, "{:?}", p);
        assert!(p.y > 0.0);
    }
}

/// Every configured variant gets a distinct cached shape.
#[test]
fn test_default_variants_have_shapes() {
    let config = SyncConfig::default();
    let mut registry = AgentRegistry::from_config(&config);
    for (kind, agent) in init_snapshot().iter() {
        registry.create(kind, agent).unwrap();
    }

    for instance in registry.iter() {
        let variant = instance.variant().expect("default pool covers every kind");
        let shape = AgentShape::for_agent(instance.kind(), Some(variant));
        assert_eq!(shape.key, variant.name);
        if instance.kind() == AgentKind::Pedestrian {
            assert!(shape.size[1] > shape.size[0], "pedestrians stand upright");
        }
    }
}

/// Test the shipped configuration file parses.
#[test]
fn test_parse_shipped_config() {
    let toml = include_str!("../../../city.toml");
    let config = SyncConfig::from_str(toml).unwrap();
    assert_eq!(config.server.step_path, "/data/0");
    assert_eq!(config.variants.pool.len(), 6);
}

/// The overview camera sits above the ground it frames.
#[test]
fn test_camera_above_ground() {
    let world = VisualWorld::default();
    let camera = overview_transform(&world);
    assert!(camera.translation.y > 100.0);
    assert!(camera.forward().y < 0.0);
}
