//! Render Command Hub
//!
//! Distributes render commands to renderer consumers using a tokio
//! broadcast channel. All commands flow through one channel so consumers
//! observe configuration, series replacements, and selection corrections in
//! emission order.
//!
//! The hub is the engine's outbound render port: the renderer's contract is
//! "replace with latest state". Every series flush carries the full current
//! channel state, never a delta.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::legend::SelectionCommand;
use crate::domain::series::{Markline, SeriesChannel};
use crate::infrastructure::theme::ThemeColors;

// =============================================================================
// Render Commands
// =============================================================================

/// One-off chart configuration emitted at stream setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfiguration {
    /// Upper bound of the visible time range.
    pub axis_max: DateTime<Utc>,
    /// Position of the "Today" marker.
    pub today: DateTime<Utc>,
    /// Static annotation lines.
    pub marklines: Vec<Markline>,
    /// Resolved theme color tokens.
    pub theme: ThemeColors,
}

/// Command for the external renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", content = "payload", rename_all = "camelCase")]
pub enum RenderCommand {
    /// Apply one-off chart annotations and theming.
    Configure(ChartConfiguration),
    /// Replace all series with the given full channel state.
    ReplaceSeries(Vec<SeriesChannel>),
    /// Force one channel's legend selection state.
    SetSelection(SelectionCommand),
}

/// Renderer-originated notification that the legend selection changed.
///
/// Carries the renderer's current selection map keyed by legend entry name,
/// captured after the raw toggle was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionChanged {
    /// Legend entry name to visibility.
    pub selected: HashMap<String, bool>,
}

// =============================================================================
// Render Hub
// =============================================================================

/// Configuration for the render hub.
#[derive(Debug, Clone, Copy)]
pub struct RenderHubConfig {
    /// Capacity of the render command channel.
    pub commands_capacity: usize,
}

impl Default for RenderHubConfig {
    fn default() -> Self {
        Self {
            commands_capacity: 1_024,
        }
    }
}

/// Broadcast hub for render commands.
///
/// Supports any number of renderer consumers; a send with no active
/// consumers is not an error (the chart simply has no attached view).
///
/// # Example
///
/// ```rust
/// use chart_stream_engine::infrastructure::render::{RenderHub, RenderHubConfig};
///
/// let hub = RenderHub::new(RenderHubConfig::default());
/// let rx = hub.commands_rx();
/// // In another task, send commands:
/// // hub.send(RenderCommand::ReplaceSeries(vec![]));
/// ```
#[derive(Debug)]
pub struct RenderHub {
    commands_tx: broadcast::Sender<RenderCommand>,
}

impl RenderHub {
    /// Create a new hub with the given configuration.
    #[must_use]
    pub fn new(config: RenderHubConfig) -> Self {
        Self {
            commands_tx: broadcast::channel(config.commands_capacity).0,
        }
    }

    /// Create a new hub with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RenderHubConfig::default())
    }

    /// Send a render command to all consumers.
    ///
    /// Returns the number of consumers that received the command, or `None`
    /// if there are none.
    pub fn send(&self, command: RenderCommand) -> Option<usize> {
        self.commands_tx.send(command).ok()
    }

    /// Get a new receiver for render commands.
    #[must_use]
    pub fn commands_rx(&self) -> broadcast::Receiver<RenderCommand> {
        self.commands_tx.subscribe()
    }

    /// Get the number of active render command consumers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.commands_tx.receiver_count()
    }
}

/// Shared render hub reference.
pub type SharedRenderHub = Arc<RenderHub>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::{ChannelKind, Entity};

    fn test_channel() -> SeriesChannel {
        let entity = Entity {
            id: "acc-1".to_string(),
            name: "Savings".to_string(),
            color: None,
            group: "Savings".to_string(),
        };
        SeriesChannel::for_entity(&entity, ChannelKind::Main, "#D32F2F")
    }

    #[test]
    fn send_with_no_receivers_returns_none() {
        let hub = RenderHub::with_defaults();
        assert!(hub.send(RenderCommand::ReplaceSeries(vec![])).is_none());
    }

    #[tokio::test]
    async fn send_and_receive_command() {
        let hub = RenderHub::with_defaults();
        let mut rx = hub.commands_rx();

        let sent = hub.send(RenderCommand::ReplaceSeries(vec![test_channel()]));
        assert_eq!(sent, Some(1));

        match rx.recv().await.unwrap() {
            RenderCommand::ReplaceSeries(channels) => {
                assert_eq!(channels.len(), 1);
                assert_eq!(channels[0].id, "acc-1");
            }
            other => panic!("expected ReplaceSeries, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn multiple_receivers_observe_same_order() {
        let hub = RenderHub::with_defaults();
        let mut rx1 = hub.commands_rx();
        let mut rx2 = hub.commands_rx();
        assert_eq!(hub.receiver_count(), 2);

        let _ = hub.send(RenderCommand::ReplaceSeries(vec![]));
        let _ = hub.send(RenderCommand::SetSelection(SelectionCommand {
            channel: "Savings".to_string(),
            visible: false,
        }));

        for rx in [&mut rx1, &mut rx2] {
            assert!(matches!(
                rx.recv().await.unwrap(),
                RenderCommand::ReplaceSeries(_)
            ));
            assert!(matches!(
                rx.recv().await.unwrap(),
                RenderCommand::SetSelection(_)
            ));
        }
    }

    #[test]
    fn render_command_serializes_with_tag() {
        let command = RenderCommand::SetSelection(SelectionCommand {
            channel: "Savings min".to_string(),
            visible: true,
        });
        let json = serde_json::to_string(&command).unwrap();
        assert!(json.contains(r#""command":"setSelection""#));
        assert!(json.contains(r#""channel":"Savings min""#));
    }
}
