//! Sync runner: drives the city-sync core from the Bevy frame loop.
//!
//! The runner owns the tokio runtime that fetches snapshots and the
//! [`SyncManager`] that applies them. Every `Update` it calls
//! [`SyncManager::tick`] with the frame delta; nothing else mutates agent
//! state.

use bevy::app::AppExit;
use bevy::prelude::*;
use std::sync::{Mutex, PoisonError};

use city_sync::{FetchKind, HttpSimulationClient, SyncConfig, SyncManager, TickReport};

/// Plugin for the simulation sync loop.
pub struct SyncRunnerPlugin;

impl Plugin for SyncRunnerPlugin {
    fn build(&self, app: &mut App) {
        // SyncRunner should be inserted by main.rs before adding this plugin
        if !app.world().contains_resource::<SyncRunner>() {
            match SyncRunner::new(&SyncConfig::default()) {
                Ok(runner) => {
                    app.insert_resource(runner);
                }
                Err(e) => {
                    tracing::error!("Failed to start sync runtime: {}", e);
                    return;
                }
            }
        }

        app.add_event::<SyncEvent>()
            .add_systems(Startup, start_sync)
            .add_systems(
                Update,
                (tick_sync, handle_sync_input, shutdown_on_exit)
                    .chain()
                    .in_set(SyncSet),
            );
    }
}

/// Systems that advance the sync core. Rendering runs after it.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncSet;

/// Lifecycle notifications for other plugins.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Init snapshot applied; agents exist.
    Initialized,
    /// A step snapshot retargeted the agents.
    StepApplied { steps: u64 },
    /// Init failed. The manager is uninitialized again unless an automatic
    /// retry already went out.
    InitFailed { error: String },
}

/// Resource owning the sync core and its runtime.
#[derive(Resource)]
pub struct SyncRunner {
    // Declared before the runtime so in-flight fetches are aborted first
    manager: Mutex<SyncManager<HttpSimulationClient>>,
    runtime: tokio::runtime::Runtime,
    /// Report from the most recent frame.
    pub last_report: Option<TickReport>,
}

impl SyncRunner {
    /// Builds a runtime and a manager talking HTTP to the configured server.
    pub fn new(config: &SyncConfig) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("city-sync")
            .enable_all()
            .build()?;

        let client = HttpSimulationClient::new(&config.server);
        let manager = SyncManager::new(client, config, runtime.handle().clone());

        tracing::info!("Sync runner targeting {}", config.server.base_url);
        Ok(Self {
            manager: Mutex::new(manager),
            runtime,
            last_report: None,
        })
    }

    /// The sync manager. Only ever touched from the frame loop.
    pub fn manager(&mut self) -> &mut SyncManager<HttpSimulationClient> {
        self.manager
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn runtime(&self) -> &tokio::runtime::Runtime {
        &self.runtime
    }

    /// Runs one frame and reports what it changed.
    pub fn tick(&mut self, dt: f32) -> Vec<SyncEvent> {
        let report = self.manager().tick(dt);
        self.last_report = Some(report);

        let mut events = Vec::new();
        match report.applied {
            Some(FetchKind::Init) => events.push(SyncEvent::Initialized),
            Some(FetchKind::Step) => events.push(SyncEvent::StepApplied {
                steps: self.manager().stats().steps_applied,
            }),
            None => {}
        }

        if report.failed == Some(FetchKind::Init) {
            let error = self
                .manager()
                .last_error()
                .map(ToString::to_string)
                .unwrap_or_default();
            events.push(SyncEvent::InitFailed { error });
        }

        events
    }
}

/// Issues the init fetch on startup.
fn start_sync(mut runner: ResMut<SyncRunner>) {
    if let Err(e) = runner.manager().initialize() {
        tracing::warn!("Could not start sync: {}", e);
    }
}

/// Advances the sync core by one frame.
fn tick_sync(
    time: Res<Time>,
    mut runner: ResMut<SyncRunner>,
    mut events: EventWriter<SyncEvent>,
) {
    let emitted = runner.tick(time.delta_seconds());

    for event in &emitted {
        match event {
            SyncEvent::Initialized => tracing::info!("Agents spawned from init snapshot"),
            SyncEvent::StepApplied { steps } => tracing::debug!("Step {} applied", steps),
            SyncEvent::InitFailed { error } => tracing::warn!("Init failed: {}", error),
        }
    }
    events.send_batch(emitted);
}

/// Handles keyboard input for sync control (R to retry init).
fn handle_sync_input(keyboard: Res<ButtonInput<KeyCode>>, mut runner: ResMut<SyncRunner>) {
    if keyboard.just_pressed(KeyCode::KeyR) {
        match runner.manager().initialize() {
            Ok(()) => tracing::info!("Retrying simulation init"),
            Err(e) => tracing::info!("Retry ignored: {}", e),
        }
    }
}

/// Aborts any fetch still in flight when the app is closing.
fn shutdown_on_exit(mut exit: EventReader<AppExit>, mut runner: ResMut<SyncRunner>) {
    if exit.read().next().is_some() {
        runner.manager().shutdown();
    }
}
