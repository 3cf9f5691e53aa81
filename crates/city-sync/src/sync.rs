//! Convergence-gated synchronization with the remote simulation.
//!
//! The manager asks for the next simulation step only once the local agents
//! have visibly caught up with the previous one (mean distance-to-target
//! below a tolerance). Fetches run as tokio tasks; each reports back through
//! a completion queue that [`SyncManager::tick`] drains at the start of the
//! frame, so a snapshot is always applied whole, between two motion steps.
//!
//! ```text
//! Uninitialized --initialize()--> Initializing --init ok--> Synced
//!       ^                              |                      |
//!       +--------- init failed --------+        step fetch <--+ (mean < tolerance)
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use city_events::{AgentKind, GridSize, StepSnapshot};

use crate::client::SimulationClient;
use crate::config::{MotionConfig, PollConfig, SyncConfig, Tuning};
use crate::error::{FetchError, RegistryError, SyncError};
use crate::motion::MotionController;
use crate::registry::AgentRegistry;

/// Lifecycle of the connection to the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No init has succeeded yet.
    #[default]
    Uninitialized,
    /// Init fetch in flight.
    Initializing,
    /// Registry populated; stepping.
    Synced,
}

/// Which server call a fetch made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Init,
    Step,
}

/// Counters for the host's debug surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Step snapshots applied to the registry.
    pub steps_applied: u64,
    /// Fetches that returned an error or timed out.
    pub fetch_failures: u64,
    /// Snapshots that arrived but violated the create/update protocol.
    pub rejected_snapshots: u64,
    /// Completions discarded because a newer request superseded them.
    pub stale_completions: u64,
}

/// What happened during one [`SyncManager::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub state: SyncState,
    /// Mean distance-to-target after this frame's motion.
    pub mean_distance: f32,
    /// Agents that moved this frame.
    pub moving: usize,
    /// A snapshot applied at the start of this frame.
    pub applied: Option<FetchKind>,
    /// A fetch that failed or was rejected at the start of this frame. Set
    /// even when an automatic init retry was issued in the same frame.
    pub failed: Option<FetchKind>,
    /// Whether a new step fetch was issued at the end of this frame.
    pub fetch_issued: bool,
}

/// A finished fetch, as delivered to the frame loop.
struct Completion {
    generation: u64,
    kind: FetchKind,
    result: Result<StepSnapshot, FetchError>,
}

struct InFlight {
    generation: u64,
    kind: FetchKind,
    handle: JoinHandle<()>,
}

/// Whether the agents are close enough to their targets to ask for more.
pub fn converged(mean_distance: f32, tolerance: f32) -> bool {
    mean_distance < tolerance
}

/// Ties the [`AgentRegistry`] to a [`SimulationClient`].
pub struct SyncManager<C> {
    client: Arc<C>,
    runtime: Handle,
    registry: AgentRegistry,
    controller: MotionController,
    poll: PollConfig,
    population: (u32, u32),
    request_timeout: Duration,
    state: SyncState,
    generation: u64,
    in_flight: Option<InFlight>,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
    /// Seconds left before another step fetch may follow a failure.
    cooldown: f32,
    /// Seconds left before a failed init is re-issued.
    init_retry_in: Option<f32>,
    grid_size: Option<GridSize>,
    last_error: Option<SyncError>,
    stats: SyncStats,
}

impl<C: SimulationClient> SyncManager<C> {
    /// Creates a manager whose fetches are spawned on `runtime`.
    pub fn new(client: C, config: &SyncConfig, runtime: Handle) -> Self {
        Self::with_registry(client, config, runtime, AgentRegistry::from_config(config))
    }

    /// Like [`SyncManager::new`], with a caller-built registry.
    pub fn with_registry(
        client: C,
        config: &SyncConfig,
        runtime: Handle,
        registry: AgentRegistry,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            client: Arc::new(client),
            runtime,
            registry,
            controller: MotionController::new(config.motion.arrival_threshold),
            poll: config.sync,
            population: (config.server.cars, config.server.pedestrians),
            request_timeout: config.server.request_timeout(),
            state: SyncState::Uninitialized,
            generation: 0,
            in_flight: None,
            completions_tx,
            completions_rx,
            cooldown: 0.0,
            init_retry_in: None,
            grid_size: None,
            last_error: None,
            stats: SyncStats::default(),
        }
    }

    /// Issues the init fetch.
    ///
    /// Only valid while uninitialized; a second call while the first is in
    /// flight or after it succeeded returns [`SyncError::AlreadyInitialized`].
    pub fn initialize(&mut self) -> Result<(), SyncError> {
        if self.state != SyncState::Uninitialized {
            tracing::warn!("Ignoring initialize() in state {:?}", self.state);
            return Err(SyncError::AlreadyInitialized);
        }

        let (cars, pedestrians) = self.population;
        tracing::info!(
            "Requesting simulation init ({} cars, {} pedestrians)",
            cars,
            pedestrians
        );

        self.init_retry_in = None;
        self.state = SyncState::Initializing;
        self.dispatch(FetchKind::Init);
        Ok(())
    }

    /// Runs one frame: apply finished fetches, move agents, maybe poll.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        let (applied, failed) = self.drain_completions();

        let moving = self.registry.advance_all(&self.controller, dt);
        let mean_distance = self.registry.mean_distance();

        self.cooldown = (self.cooldown - dt).max(0.0);
        self.retry_init(dt);

        let fetch_issued = self.should_poll(mean_distance);
        if fetch_issued {
            self.dispatch(FetchKind::Step);
        }

        TickReport {
            state: self.state,
            mean_distance,
            moving,
            applied,
            failed,
            fetch_issued,
        }
    }

    /// Applies new tuning from the host.
    ///
    /// Speed and rotation changes reach agents on their next update, the
    /// scale factor applies to positions transformed from now on.
    pub fn configure(&mut self, tuning: Tuning) {
        let motion = MotionConfig {
            speed: tuning.speed,
            rotation_rate: tuning.rotation_rate,
            pedestrian_speed_factor: tuning.pedestrian_speed_factor,
            ..*self.registry.motion()
        };
        self.registry.set_motion(motion);
        self.registry.set_scale_factor(tuning.scale_factor);
        self.poll.tolerance = tuning.tolerance;
        tracing::info!("Applied tuning {:?}", tuning);
    }

    fn should_poll(&self, mean_distance: f32) -> bool {
        self.state == SyncState::Synced
            && self.in_flight.is_none()
            && self.cooldown <= 0.0
            && converged(mean_distance, self.poll.tolerance)
    }

    fn retry_init(&mut self, dt: f32) {
        if self.state != SyncState::Uninitialized || self.in_flight.is_some() {
            return;
        }
        let Some(remaining) = self.init_retry_in.as_mut() else {
            return;
        };
        *remaining -= dt;
        if *remaining <= 0.0 {
            tracing::info!("Retrying simulation init");
            // State is Uninitialized here, so this cannot fail
            let _ = self.initialize();
        }
    }

    /// Spawns a fetch task, superseding any request still held.
    fn dispatch(&mut self, kind: FetchKind) {
        if let Some(previous) = self.in_flight.take() {
            tracing::debug!(
                "Cancelling {:?} fetch (generation {})",
                previous.kind,
                previous.generation
            );
            previous.handle.abort();
        }

        self.generation += 1;
        let generation = self.generation;
        let client = Arc::clone(&self.client);
        let tx = self.completions_tx.clone();
        let timeout = self.request_timeout;
        let (cars, pedestrians) = self.population;

        let handle = self.runtime.spawn(async move {
            let request = async {
                match kind {
                    FetchKind::Init => client.fetch_init(cars, pedestrians).await,
                    FetchKind::Step => client.fetch_step().await,
                }
            };
            let result = match tokio::time::timeout(timeout, request).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(timeout)),
            };
            // The receiver only goes away with the manager
            let _ = tx.send(Completion {
                generation,
                kind,
                result,
            });
        });

        tracing::debug!("Issued {:?} fetch (generation {})", kind, generation);
        self.in_flight = Some(InFlight {
            generation,
            kind,
            handle,
        });
    }

    /// Applies every finished fetch. Returns the last kinds applied and
    /// failed.
    fn drain_completions(&mut self) -> (Option<FetchKind>, Option<FetchKind>) {
        let mut applied = None;
        let mut failed = None;

        while let Ok(completion) = self.completions_rx.try_recv() {
            let kind = match &self.in_flight {
                Some(in_flight) if in_flight.generation == completion.generation => in_flight.kind,
                _ => {
                    tracing::debug!(
                        "Discarding stale {:?} fetch (generation {})",
                        completion.kind,
                        completion.generation
                    );
                    self.stats.stale_completions += 1;
                    continue;
                }
            };
            self.in_flight = None;

            match completion.result {
                Ok(snapshot) => {
                    let outcome = match kind {
                        FetchKind::Init => self.apply_init(snapshot),
                        FetchKind::Step => self.apply_step(snapshot),
                    };
                    match outcome {
                        Ok(()) => applied = Some(kind),
                        Err(e) => {
                            self.reject(kind, e);
                            failed = Some(kind);
                        }
                    }
                }
                Err(e) => {
                    self.fetch_failed(kind, e);
                    failed = Some(kind);
                }
            }
        }

        (applied, failed)
    }

    /// Creates one instance per agent in the init snapshot.
    fn apply_init(&mut self, snapshot: StepSnapshot) -> Result<(), SyncError> {
        for kind in AgentKind::ALL {
            let mut seen = HashSet::new();
            for agent in snapshot.agents(kind) {
                if !seen.insert(agent.id) || self.registry.contains(kind, agent.id) {
                    return Err(RegistryError::DuplicateId { kind, id: agent.id }.into());
                }
            }
        }

        for (kind, agent) in snapshot.iter() {
            self.registry.create(kind, agent)?;
        }

        self.grid_size = snapshot.grid_size.or(self.grid_size);
        self.state = SyncState::Synced;
        self.last_error = None;
        tracing::info!(
            "Simulation initialized: {} cars, {} transit vehicles, {} pedestrians",
            self.registry.len(AgentKind::Car),
            self.registry.len(AgentKind::TransitVehicle),
            self.registry.len(AgentKind::Pedestrian)
        );
        Ok(())
    }

    /// Retargets every instance named in a step snapshot.
    fn apply_step(&mut self, snapshot: StepSnapshot) -> Result<(), SyncError> {
        if let Some((kind, agent)) = snapshot
            .iter()
            .find(|(kind, agent)| !self.registry.contains(*kind, agent.id))
        {
            return Err(RegistryError::UnknownId { kind, id: agent.id }.into());
        }

        for (kind, agent) in snapshot.iter() {
            self.registry.update(kind, agent)?;
        }

        self.grid_size = snapshot.grid_size.or(self.grid_size);
        self.stats.steps_applied += 1;
        self.last_error = None;
        tracing::debug!(
            "Applied step {} ({} agents)",
            self.stats.steps_applied,
            snapshot.len()
        );
        Ok(())
    }

    fn reject(&mut self, kind: FetchKind, error: SyncError) {
        tracing::error!("Rejected {:?} snapshot: {}", kind, error);
        self.stats.rejected_snapshots += 1;
        self.after_failure(kind);
        self.last_error = Some(error);
    }

    fn fetch_failed(&mut self, kind: FetchKind, error: FetchError) {
        tracing::warn!("{:?} fetch failed: {}", kind, error);
        self.stats.fetch_failures += 1;
        self.after_failure(kind);
        self.last_error = Some(error.into());
    }

    fn after_failure(&mut self, kind: FetchKind) {
        match kind {
            FetchKind::Init => {
                self.state = SyncState::Uninitialized;
                self.init_retry_in = self.poll.init_retry_secs;
            }
            FetchKind::Step => {
                self.cooldown = self.poll.failure_cooldown_secs;
            }
        }
    }
}

impl<C> SyncManager<C> {
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Read-only view of every live agent.
    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Last grid size any snapshot reported.
    pub fn grid_size(&self) -> Option<GridSize> {
        self.grid_size
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&SyncError> {
        self.last_error.as_ref()
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Mean distance-to-target over every agent.
    pub fn mean_distance(&self) -> f32 {
        self.registry.mean_distance()
    }

    pub fn tolerance(&self) -> f32 {
        self.poll.tolerance
    }

    /// Aborts any fetch in flight.
    ///
    /// An interrupted init drops back to `Uninitialized`.
    pub fn shutdown(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            tracing::info!("Aborting {:?} fetch", in_flight.kind);
            in_flight.handle.abort();
        }
        if self.state == SyncState::Initializing {
            self.state = SyncState::Uninitialized;
        }
    }
}

impl<C> Drop for SyncManager<C> {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converged_is_strict() {
        assert!(converged(0.0, 1.0));
        assert!(converged(0.99, 1.0));
        assert!(!converged(1.0, 1.0));
        assert!(!converged(3.0, 1.0));
    }

    #[test]
    fn test_convergence_predicate_single_outlier() {
        // n agents at their targets except one at distance d
        let (n, d, tolerance) = (8.0_f32, 6.0_f32, 1.0_f32);
        assert!(converged(d / n, tolerance));
        assert!(!converged(d / 4.0, tolerance));
    }

    #[test]
    fn test_default_state() {
        assert_eq!(SyncState::default(), SyncState::Uninitialized);
        assert_eq!(SyncStats::default().steps_applied, 0);
    }
}
