//! Debug overlay for development information display.
//!
//! Shows FPS, sync state, convergence, fetch counters, and the last sync
//! error. Toggle with F3.

use bevy::prelude::*;
use std::collections::VecDeque;

use city_events::AgentKind;
use city_sync::{SyncState, SyncStats};

use crate::sync_runner::{SyncRunner, SyncSet};

/// Plugin for the debug overlay.
pub struct DebugPlugin;

impl Plugin for DebugPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DebugOverlay>()
            .add_systems(Startup, setup_debug_overlay)
            .add_systems(
                Update,
                (toggle_debug_overlay, update_debug_display)
                    .chain()
                    .after(SyncSet),
            );
    }
}

/// Resource controlling debug overlay settings.
#[derive(Resource)]
pub struct DebugOverlay {
    /// Whether the debug overlay is visible.
    pub enabled: bool,
    pub show_fps: bool,
    /// Show fetch counters.
    pub show_stats: bool,
}

impl Default for DebugOverlay {
    fn default() -> Self {
        Self {
            enabled: false,
            show_fps: true,
            show_stats: true,
        }
    }
}

/// Component marking the debug overlay container.
#[derive(Component)]
pub struct DebugOverlayContainer;

/// Component for the debug text.
#[derive(Component)]
pub struct DebugText;

/// Local resource for FPS history.
#[derive(Default)]
struct FpsHistory {
    history: VecDeque<f32>,
}

impl FpsHistory {
    fn push(&mut self, fps: f32) {
        self.history.push_back(fps);
        if self.history.len() > 60 {
            self.history.pop_front();
        }
    }

    fn average(&self) -> f32 {
        if self.history.is_empty() {
            0.0
        } else {
            self.history.iter().sum::<f32>() / self.history.len() as f32
        }
    }
}

/// Everything the overlay prints, gathered once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugSnapshot {
    pub fps: f32,
    pub state: SyncState,
    pub fetching: bool,
    pub mean_distance: f32,
    pub tolerance: f32,
    /// Cars, transit vehicles, pedestrians.
    pub counts: [usize; 3],
    pub stats: SyncStats,
    pub last_error: Option<String>,
}

impl DebugSnapshot {
    /// Overlay lines for the enabled sections.
    pub fn lines(&self, overlay: &DebugOverlay) -> Vec<String> {
        let mut lines = Vec::new();

        if overlay.show_fps {
            let fps_color = if self.fps < 30.0 { "LOW!" } else { "" };
            lines.push(format!("FPS: {:.0} {}", self.fps, fps_color));
        }

        let fetching = if self.fetching { " (fetching)" } else { "" };
        lines.push(format!("Sync: {:?}{}", self.state, fetching));
        lines.push(format!(
            "Mean distance: {:.2} / {:.2}",
            self.mean_distance, self.tolerance
        ));
        let [cars, transit, pedestrians] = self.counts;
        lines.push(format!(
            "Agents: {} cars, {} buses, {} pedestrians",
            cars, transit, pedestrians
        ));

        if overlay.show_stats {
            lines.push(format!("Steps applied: {}", self.stats.steps_applied));
            lines.push(format!(
                "Failures: {} fetch, {} rejected, {} stale",
                self.stats.fetch_failures,
                self.stats.rejected_snapshots,
                self.stats.stale_completions
            ));
        }

        if let Some(ref error) = self.last_error {
            lines.push(format!("ERROR: {}", error));
        }

        lines
    }
}

/// System to set up the debug overlay UI.
fn setup_debug_overlay(mut commands: Commands) {
    // Debug overlay container (top-left)
    commands
        .spawn((
            NodeBundle {
                style: Style {
                    position_type: PositionType::Absolute,
                    top: Val::Px(10.0),
                    left: Val::Px(10.0),
                    padding: UiRect::all(Val::Px(10.0)),
                    flex_direction: FlexDirection::Column,
                    ..default()
                },
                background_color: Color::srgba(0.0, 0.0, 0.0, 0.8).into(),
                visibility: Visibility::Hidden,
                ..default()
            },
            DebugOverlayContainer,
        ))
        .with_children(|parent| {
            parent.spawn(TextBundle::from_section(
                "DEBUG (F3 to toggle, R to retry init)",
                TextStyle {
                    font_size: 14.0,
                    color: Color::srgb(0.9, 0.9, 0.3),
                    ..default()
                },
            ));

            parent.spawn((
                TextBundle::from_section(
                    "",
                    TextStyle {
                        font_size: 12.0,
                        color: Color::srgb(0.8, 0.8, 0.8),
                        ..default()
                    },
                ),
                DebugText,
            ));
        });
}

/// System to toggle debug overlay with F3.
fn toggle_debug_overlay(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut debug_overlay: ResMut<DebugOverlay>,
    mut container: Query<&mut Visibility, With<DebugOverlayContainer>>,
) {
    if keyboard.just_pressed(KeyCode::F3) {
        debug_overlay.enabled = !debug_overlay.enabled;

        for mut visibility in container.iter_mut() {
            *visibility = if debug_overlay.enabled {
                Visibility::Inherited
            } else {
                Visibility::Hidden
            };
        }

        let status = if debug_overlay.enabled { "ON" } else { "OFF" };
        tracing::info!("Debug overlay: {}", status);
    }
}

/// System to update debug display data.
fn update_debug_display(
    debug_overlay: Res<DebugOverlay>,
    mut runner: ResMut<SyncRunner>,
    time: Res<Time>,
    mut fps_history: Local<FpsHistory>,
    mut debug_text: Query<&mut Text, With<DebugText>>,
) {
    let dt = time.delta_seconds();
    if dt > 0.0 {
        fps_history.push(1.0 / dt);
    }

    if !debug_overlay.enabled {
        return;
    }

    let manager = runner.manager();
    let registry = manager.registry();
    let snapshot = DebugSnapshot {
        fps: fps_history.average(),
        state: manager.state(),
        fetching: manager.is_fetching(),
        mean_distance: manager.mean_distance(),
        tolerance: manager.tolerance(),
        counts: AgentKind::ALL.map(|kind| registry.len(kind)),
        stats: manager.stats(),
        last_error: manager.last_error().map(ToString::to_string),
    };

    let fps = snapshot.fps;
    let text_value = snapshot.lines(&debug_overlay).join("\n");
    for mut text in debug_text.iter_mut() {
        if let Some(section) = text.sections.first_mut() {
            section.value = text_value.clone();
            // Change text color based on FPS
            section.style.color = if fps < 30.0 {
                Color::srgb(1.0, 0.3, 0.3) // Red for low FPS
            } else if fps < 55.0 {
                Color::srgb(1.0, 0.8, 0.3) // Yellow for medium FPS
            } else {
                Color::srgb(0.8, 0.8, 0.8) // Gray for good FPS
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> DebugSnapshot {
        DebugSnapshot {
            fps: 60.0,
            state: SyncState::Synced,
            fetching: true,
            mean_distance: 0.42,
            tolerance: 1.0,
            counts: [3, 1, 2],
            stats: SyncStats {
                steps_applied: 7,
                fetch_failures: 1,
                rejected_snapshots: 0,
                stale_completions: 2,
            },
            last_error: None,
        }
    }

    #[test]
    fn test_debug_overlay_default() {
        let overlay = DebugOverlay::default();
        assert!(!overlay.enabled);
        assert!(overlay.show_fps);
        assert!(overlay.show_stats);
    }

    #[test]
    fn test_fps_history() {
        let mut history = FpsHistory::default();
        assert_eq!(history.average(), 0.0);

        history.push(60.0);
        history.push(60.0);
        assert_eq!(history.average(), 60.0);

        history.push(30.0);
        assert!((history.average() - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_lines_report_sync() {
        let lines = snapshot().lines(&DebugOverlay::default());
        assert!(lines.contains(&"Sync: Synced (fetching)".to_string()));
        assert!(lines.contains(&"Mean distance: 0.42 / 1.00".to_string()));
        assert!(lines.contains(&"Agents: 3 cars, 1 buses, 2 pedestrians".to_string()));
        assert!(lines.contains(&"Steps applied: 7".to_string()));
    }

    #[test]
    fn test_lines_respect_toggles() {
        let overlay = DebugOverlay {
            enabled: true,
            show_fps: false,
            show_stats: false,
        };
        let mut snapshot = snapshot();
        snapshot.last_error = Some("request timed out after 5s".into());

        let lines = snapshot.lines(&overlay);
        assert!(!lines.iter().any(|l| l.starts_with("FPS")));
        assert!(!lines.iter().any(|l| l.starts_with("Steps")));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("ERROR: request timed out after 5s")
        );
    }
}
