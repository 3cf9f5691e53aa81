//! Visual variant pools.
//!
//! The host draws every agent from one of a handful of prototypes per kind.
//! Which one is irrelevant to synchronization, so the pick is uniform and
//! seeded for reproducible runs.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;

use city_events::AgentKind;

use crate::config::{VariantEntry, VariantsConfig};

/// A renderable prototype.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: String,
    /// Linear RGB
    pub color: [f32; 3],
    /// Width, height, length in render units
    pub size: [f32; 3],
}

impl From<&VariantEntry> for Variant {
    fn from(entry: &VariantEntry) -> Self {
        Self {
            name: entry.name.clone(),
            color: entry.color,
            size: entry.size,
        }
    }
}

/// Supplies a prototype for a new agent.
pub trait VariantProvider: Send + Sync {
    /// Returns one prototype for `kind`, or `None` when none is configured.
    fn pick(&mut self, kind: AgentKind) -> Option<Variant>;
}

/// Uniform random pick from a configured pool.
pub struct VariantPool {
    pools: HashMap<AgentKind, Vec<Variant>>,
    rng: SmallRng,
}

impl VariantPool {
    pub fn new(seed: u64) -> Self {
        Self {
            pools: HashMap::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Builds the pool from config entries.
    ///
    /// Entries whose kind code is not a known agent kind are logged and
    /// skipped.
    pub fn from_config(config: &VariantsConfig) -> Self {
        let mut pool = Self::new(config.seed);
        for entry in &config.pool {
            match AgentKind::try_from(entry.kind) {
                Ok(kind) => pool.add(kind, Variant::from(entry)),
                Err(e) => tracing::warn!("Skipping variant '{}': {}", entry.name, e),
            }
        }
        pool
    }

    pub fn add(&mut self, kind: AgentKind, variant: Variant) {
        self.pools.entry(kind).or_default().push(variant);
    }

    /// Number of prototypes configured for a kind.
    pub fn len(&self, kind: AgentKind) -> usize {
        self.pools.get(&kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.pools.values().all(Vec::is_empty)
    }
}

impl VariantProvider for VariantPool {
    fn pick(&mut self, kind: AgentKind) -> Option<Variant> {
        self.pools.get(&kind)?.choose(&mut self.rng).cloned()
    }
}
