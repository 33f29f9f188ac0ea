//! Stream Wire Message Types
//!
//! Wire format types for the balance projection event stream, plus the
//! decoded message model handed to the session.
//!
//! # Wire Format
//!
//! Each WebSocket text frame is a JSON envelope with a named event:
//!
//! ```json
//! {"event": "setup", "data": {"entities": [...], "max": 1767139200000, "marklines": [...]}}
//! {"event": "balanceSnapshot", "data": {"id": "acc-1", "day": 1735689600000, "balance": 100.0, "lowerBound": 90.0, "upperBound": 110.0}}
//! {"event": "close"}
//! ```
//!
//! Timestamps travel as Unix milliseconds and are converted to UTC
//! date-times during decoding.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::series::{BalanceSnapshot, Entity, Markline};

// =============================================================================
// Event Names
// =============================================================================

/// Event name of the initial setup message.
pub const SETUP_EVENT: &str = "setup";

/// Event name of the repeating per-update snapshot message.
pub const SNAPSHOT_EVENT: &str = "balanceSnapshot";

/// Event name of the end-of-stream message.
pub const CLOSE_EVENT: &str = "close";

// =============================================================================
// Wire Payloads
// =============================================================================

/// Outer envelope of every stream frame.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEnvelope {
    /// Event name.
    pub event: String,
    /// Event payload; absent for `close`.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One balance snapshot on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotPayload {
    /// Entity id the snapshot belongs to.
    pub id: String,
    /// Point in time as Unix milliseconds.
    pub day: i64,
    /// Central balance estimate.
    pub balance: Decimal,
    /// Lower confidence bound.
    #[serde(rename = "lowerBound")]
    pub lower_bound: Decimal,
    /// Upper confidence bound.
    #[serde(rename = "upperBound")]
    pub upper_bound: Decimal,
}

/// One entity definition in the setup payload.
///
/// `color` and `group` may be absent or empty; an empty color means "assign
/// from the palette" and an absent group defaults to the entity name.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityPayload {
    /// Unique entity key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Explicit line color, empty for palette assignment.
    #[serde(default)]
    pub color: Option<String>,
    /// Legend cluster key; defaults to `name`.
    #[serde(default)]
    pub group: Option<String>,
    /// Historical snapshots embedded at setup.
    #[serde(default)]
    pub snapshots: Vec<SnapshotPayload>,
}

/// One markline annotation on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct MarklinePayload {
    /// Annotation label.
    pub name: String,
    /// Annotation date as Unix milliseconds.
    pub date: i64,
    /// Optional line color.
    #[serde(default)]
    pub color: Option<String>,
}

/// The setup payload carried by the first structured message.
#[derive(Debug, Clone, Deserialize)]
pub struct SetupPayload {
    /// Upper bound of the visible time range as Unix milliseconds.
    pub max: i64,
    /// Full initial entity list with embedded history.
    pub entities: Vec<EntityPayload>,
    /// Static annotation lines.
    #[serde(default)]
    pub marklines: Vec<MarklinePayload>,
}

// =============================================================================
// Decoded Messages
// =============================================================================

/// One entity and its embedded historical snapshots from the setup message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySetup {
    /// The entity definition.
    pub entity: Entity,
    /// Embedded history, replayed in given order.
    pub snapshots: Vec<BalanceSnapshot>,
}

/// Decoded setup event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupEvent {
    /// Entities with embedded history.
    pub entities: Vec<EntitySetup>,
    /// Upper bound of the visible time range.
    pub axis_max: DateTime<Utc>,
    /// Static annotation lines.
    pub marklines: Vec<Markline>,
}

/// A decoded stream message, dispatched through one typed handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartMessage {
    /// First structured message: entity list, history, range, marklines.
    Setup(SetupEvent),
    /// One live balance snapshot.
    Snapshot(BalanceSnapshot),
    /// End of stream.
    Close,
}

impl ChartMessage {
    /// Event name this message arrived under.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Setup(_) => SETUP_EVENT,
            Self::Snapshot(_) => SNAPSHOT_EVENT,
            Self::Close => CLOSE_EVENT,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_payload_deserializes_wire_names() {
        let json = r#"{"id":"acc-1","day":1000,"balance":100.5,"lowerBound":90.25,"upperBound":110.75}"#;
        let payload: SnapshotPayload = serde_json::from_str(json).unwrap();

        assert_eq!(payload.id, "acc-1");
        assert_eq!(payload.day, 1000);
        assert_eq!(payload.balance.to_string(), "100.5");
        assert_eq!(payload.lower_bound.to_string(), "90.25");
        assert_eq!(payload.upper_bound.to_string(), "110.75");
    }

    #[test]
    fn entity_payload_defaults_optional_fields() {
        let json = r#"{"id":"acc-1","name":"Savings"}"#;
        let payload: EntityPayload = serde_json::from_str(json).unwrap();

        assert!(payload.color.is_none());
        assert!(payload.group.is_none());
        assert!(payload.snapshots.is_empty());
    }

    #[test]
    fn envelope_without_data_defaults_to_null() {
        let envelope: StreamEnvelope = serde_json::from_str(r#"{"event":"close"}"#).unwrap();
        assert_eq!(envelope.event, "close");
        assert!(envelope.data.is_null());
    }

    #[test]
    fn event_names_round_trip() {
        assert_eq!(ChartMessage::Close.event_name(), "close");
    }
}
