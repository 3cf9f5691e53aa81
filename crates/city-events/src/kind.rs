//! Agent Kinds and Facings
//!
//! Closed enums for the two integer discriminators on the wire: the agent
//! kind (which list an agent belongs to) and the facing code each agent
//! carries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three populations the simulation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Car,
    TransitVehicle,
    Pedestrian,
}

impl AgentKind {
    /// All kinds, in wire order.
    pub const ALL: [AgentKind; 3] = [
        AgentKind::Car,
        AgentKind::TransitVehicle,
        AgentKind::Pedestrian,
    ];

    /// Stable integer code (0 car, 1 transit vehicle, 2 pedestrian).
    pub fn code(self) -> i64 {
        match self {
            AgentKind::Car => 0,
            AgentKind::TransitVehicle => 1,
            AgentKind::Pedestrian => 2,
        }
    }

    /// Whether this kind travels at street level.
    pub fn is_vehicle(self) -> bool {
        !matches!(self, AgentKind::Pedestrian)
    }

    /// Human-readable label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Car => "car",
            AgentKind::TransitVehicle => "transit_vehicle",
            AgentKind::Pedestrian => "pedestrian",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An agent-kind code outside `{0, 1, 2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent kind code {0}")]
pub struct UnknownKind(pub i64);

impl TryFrom<i64> for AgentKind {
    type Error = UnknownKind;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(AgentKind::Car),
            1 => Ok(AgentKind::TransitVehicle),
            2 => Ok(AgentKind::Pedestrian),
            other => Err(UnknownKind(other)),
        }
    }
}

/// Grid heading reported for an agent.
///
/// Decoded from the server's `direction` integer: 0 up, 1 down, 2 right,
/// 3 left. Every other value is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Facing {
    Up,
    Down,
    Right,
    Left,
    #[default]
    Unknown,
}

impl From<i64> for Facing {
    fn from(code: i64) -> Self {
        match code {
            0 => Facing::Up,
            1 => Facing::Down,
            2 => Facing::Right,
            3 => Facing::Left,
            _ => Facing::Unknown,
        }
    }
}

impl From<Facing> for i64 {
    fn from(facing: Facing) -> Self {
        match facing {
            Facing::Up => 0,
            Facing::Down => 1,
            Facing::Right => 2,
            Facing::Left => 3,
            Facing::Unknown => -1,
        }
    }
}
