//! Legend Group Synchronization
//!
//! The chart presents one legend entry per entity while the renderer backs
//! each entity with three independently selectable channels. When the user
//! toggles a legend entry, the renderer applies the raw toggle first and
//! then notifies us with its full selection map; reconciliation forces the
//! two hidden companion channels to match, so the whole group converges to
//! the same visibility.
//!
//! This is a pure function from (selection map, known channels) to
//! corrective commands, testable without any renderer present.

use std::collections::HashMap;

use serde::Serialize;

use super::aggregator::ChannelMeta;

/// Corrective legend-selection command for a single channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionCommand {
    /// Channel display name, the key the renderer selects by.
    pub channel: String,
    /// Target visibility.
    pub visible: bool,
}

/// Compute corrective selection commands from the renderer's current
/// selection map.
///
/// Every known channel is forced to its group's selection state. A group
/// absent from the map counts as deselected, mirroring the renderer's
/// falsy lookup for unknown legend keys.
#[must_use]
pub fn reconcile(
    selected: &HashMap<String, bool>,
    channels: &[ChannelMeta],
) -> Vec<SelectionCommand> {
    channels
        .iter()
        .map(|meta| SelectionCommand {
            channel: meta.name.clone(),
            visible: selected.get(&meta.group).copied().unwrap_or(false),
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
