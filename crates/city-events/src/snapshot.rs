//! Snapshot Types
//!
//! Serialization structs for simulation step snapshots.
//!
//! A snapshot is one discrete, server-authoritative description of every
//! agent position at a simulation step. Snapshots are immutable once
//! received; the client only reads them.

use serde::{Deserialize, Serialize};

use crate::{AgentKind, Facing};

/// Simulation-assigned agent identifier, unique within one agent kind.
///
/// Always a single integer. Tuple-shaped ids (`[1, 2]`) fail to parse.
pub type AgentId = u64;

/// One agent's position on the logical grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    #[serde(rename = "x")]
    pub grid_x: f32,
    #[serde(rename = "y")]
    pub grid_y: f32,
    #[serde(rename = "direction", default)]
    pub facing: Facing,
}

impl AgentSnapshot {
    pub fn new(id: AgentId, grid_x: f32, grid_y: f32, facing: Facing) -> Self {
        Self {
            id,
            grid_x,
            grid_y,
            facing,
        }
    }
}

/// Grid dimensions `[width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize(pub u32, pub u32);

impl GridSize {
    pub fn width(&self) -> u32 {
        self.0
    }

    pub fn height(&self) -> u32 {
        self.1
    }
}

/// Full step snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    #[serde(default)]
    pub cars: Vec<AgentSnapshot>,
    /// Buses. The draft server named this list `metrobus`.
    #[serde(default, rename = "metrobuses", alias = "metrobus")]
    pub transit_vehicles: Vec<AgentSnapshot>,
    #[serde(default)]
    pub pedestrians: Vec<AgentSnapshot>,
    #[serde(
        default,
        rename = "gridSize",
        alias = "grid_size",
        skip_serializing_if = "Option::is_none"
    )]
    pub grid_size: Option<GridSize>,
}

impl StepSnapshot {
    /// The agent list for one kind.
    pub fn agents(&self, kind: AgentKind) -> &[AgentSnapshot] {
        match kind {
            AgentKind::Car => &self.cars,
            AgentKind::TransitVehicle => &self.transit_vehicles,
            AgentKind::Pedestrian => &self.pedestrians,
        }
    }

    /// Mutable agent list for one kind.
    pub fn agents_mut(&mut self, kind: AgentKind) -> &mut Vec<AgentSnapshot> {
        match kind {
            AgentKind::Car => &mut self.cars,
            AgentKind::TransitVehicle => &mut self.transit_vehicles,
            AgentKind::Pedestrian => &mut self.pedestrians,
        }
    }

    /// Every agent tagged with its kind, in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentKind, &AgentSnapshot)> {
        AgentKind::ALL
            .into_iter()
            .flat_map(move |kind| self.agents(kind).iter().map(move |a| (kind, a)))
    }

    /// Total number of agents across all kinds.
    pub fn len(&self) -> usize {
        self.cars.len() + self.transit_vehicles.len() + self.pedestrians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parses a snapshot from a JSON body.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_format() {
        let json = r#"{
            "cars": [{"id": 4, "x": 1.0, "y": 3.0, "direction": 2}],
            "metrobuses": [{"id": 9, "x": 12.0, "y": 4.0, "direction": 1}],
            "pedestrians": [{"id": 4, "x": 0.5, "y": 0.5, "direction": 0}],
            "gridSize": [36, 36]
        }"#;
        let snapshot = StepSnapshot::from_json(json).unwrap();

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.cars[0], AgentSnapshot::new(4, 1.0, 3.0, Facing::Right));
        assert_eq!(snapshot.transit_vehicles[0].facing, Facing::Down);
        assert_eq!(snapshot.pedestrians[0].facing, Facing::Up);
        assert_eq!(snapshot.grid_size, Some(GridSize(36, 36)));
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let snapshot = StepSnapshot::from_json(r#"{"cars": []}"#).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.grid_size, None);
    }

    #[test]
    fn test_metrobus_alias() {
        let json = r#"{"metrobus": [{"id": 1, "x": 1, "y": 3, "direction": 1}]}"#;
        let snapshot = StepSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.agents(AgentKind::TransitVehicle).len(), 1);
    }

    #[test]
    fn test_missing_direction_is_unknown() {
        let json = r#"{"cars": [{"id": 1, "x": 2.0, "y": 3.0}]}"#;
        let snapshot = StepSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.cars[0].facing, Facing::Unknown);
    }

    #[test]
    fn test_tuple_ids_are_rejected() {
        let json = r#"{"cars": [{"id": [1, 1], "x": 1, "y": 3, "direction": 1}]}"#;
        assert!(StepSnapshot::from_json(json).is_err());
    }

    #[test]
    fn test_iter_tags_kinds_in_wire_order() {
        let snapshot = StepSnapshot {
            cars: vec![AgentSnapshot::new(1, 0.0, 0.0, Facing::Up)],
            transit_vehicles: vec![AgentSnapshot::new(2, 0.0, 0.0, Facing::Up)],
            pedestrians: vec![AgentSnapshot::new(3, 0.0, 0.0, Facing::Up)],
            grid_size: None,
        };
        let tagged: Vec<_> = snapshot.iter().map(|(kind, a)| (kind, a.id)).collect();
        assert_eq!(
            tagged,
            vec![
                (AgentKind::Car, 1),
                (AgentKind::TransitVehicle, 2),
                (AgentKind::Pedestrian, 3),
            ]
        );
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let snapshot = StepSnapshot {
            transit_vehicles: vec![AgentSnapshot::new(2, 1.0, 1.0, Facing::Left)],
            grid_size: Some(GridSize(10, 20)),
            ..Default::default()
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["metrobuses"][0]["direction"], 3);
        assert_eq!(json["gridSize"], serde_json::json!([10, 20]));
    }
}
