//! Sample data fixtures for testing.
//!
//! This module provides ready-made snapshots for other crates to use.
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // city-events = { path = "../city-events", features = ["test-fixtures"] }
//!
//! use city_events::fixtures;
//!
//! let init = fixtures::init_snapshot();
//! let step = fixtures::step_snapshot();
//! ```

use crate::{AgentId, AgentKind, AgentSnapshot, Facing, StepSnapshot};

/// Raw JSON body of the sample init response.
pub const INIT_SNAPSHOT_JSON: &str = include_str!("../tests/fixtures/init_snapshot.json");

/// Raw JSON body of the sample step response.
pub const STEP_SNAPSHOT_JSON: &str = include_str!("../tests/fixtures/step_snapshot.json");

/// Returns the sample init snapshot.
///
/// Contains:
/// - 3 cars (ids 0-2)
/// - 1 transit vehicle (id 3)
/// - 2 pedestrians (ids 4-5)
/// - a 36x36 grid
pub fn init_snapshot() -> StepSnapshot {
    serde_json::from_str(INIT_SNAPSHOT_JSON).expect("Failed to parse init_snapshot.json")
}

/// Returns the sample step that follows [`init_snapshot`].
///
/// Every agent from the init snapshot appears again, most of them one cell
/// away from where they started.
pub fn step_snapshot() -> StepSnapshot {
    serde_json::from_str(STEP_SNAPSHOT_JSON).expect("Failed to parse step_snapshot.json")
}

/// A snapshot holding a single agent of the given kind.
pub fn single_agent(kind: AgentKind, id: AgentId, grid_x: f32, grid_y: f32) -> StepSnapshot {
    let mut snapshot = StepSnapshot::default();
    snapshot
        .agents_mut(kind)
        .push(AgentSnapshot::new(id, grid_x, grid_y, Facing::Unknown));
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_parse() {
        let init = init_snapshot();
        assert_eq!(init.cars.len(), 3);
        assert_eq!(init.transit_vehicles.len(), 1);
        assert_eq!(init.pedestrians.len(), 2);

        let step = step_snapshot();
        assert_eq!(step.len(), init.len());
    }

    #[test]
    fn test_step_references_only_init_ids() {
        let init = init_snapshot();
        let step = step_snapshot();
        for (kind, agent) in step.iter() {
            assert!(
                init.agents(kind).iter().any(|a| a.id == agent.id),
                "{} {} missing from init",
                kind,
                agent.id
            );
        }
    }

    #[test]
    fn test_single_agent() {
        let snapshot = single_agent(AgentKind::Pedestrian, 7, 1.0, 2.0);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.pedestrians[0].id, 7);
    }
}
