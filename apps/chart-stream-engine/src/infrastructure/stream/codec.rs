//! Stream Codec
//!
//! Decodes JSON stream frames into [`ChartMessage`]s.
//!
//! A frame that fails to decode (unparseable JSON, an unknown event name,
//! a payload of the wrong shape, or an unrepresentable timestamp) yields a
//! [`CodecError`]. The client drops such frames and keeps the session in
//! its current state; a single corrupt message never terminates the stream.

use chrono::{DateTime, TimeZone, Utc};

use super::messages::{
    CLOSE_EVENT, ChartMessage, EntityPayload, EntitySetup, MarklinePayload, SETUP_EVENT,
    SNAPSHOT_EVENT, SetupEvent, SetupPayload, SnapshotPayload, StreamEnvelope,
};
use crate::domain::series::{BalanceSnapshot, Entity, Markline};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON parsing or shape failure.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope carried an event name we do not handle.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// A Unix-millisecond timestamp outside the representable range.
    #[error("unrepresentable timestamp: {0}")]
    InvalidTimestamp(i64),
}

/// JSON codec for the chart event stream.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one text frame into a chart message.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the envelope or its payload cannot be
    /// decoded; the frame is then dropped by the caller.
    pub fn decode(&self, text: &str) -> Result<ChartMessage, CodecError> {
        let envelope: StreamEnvelope = serde_json::from_str(text.trim())?;

        match envelope.event.as_str() {
            SETUP_EVENT => {
                let payload: SetupPayload = serde_json::from_value(envelope.data)?;
                Ok(ChartMessage::Setup(decode_setup(payload)?))
            }
            SNAPSHOT_EVENT => {
                let payload: SnapshotPayload = serde_json::from_value(envelope.data)?;
                Ok(ChartMessage::Snapshot(decode_snapshot(payload)?))
            }
            CLOSE_EVENT => Ok(ChartMessage::Close),
            other => Err(CodecError::UnknownEvent(other.to_string())),
        }
    }
}

/// Convert a Unix-millisecond wire timestamp to UTC.
fn decode_timestamp(millis: i64) -> Result<DateTime<Utc>, CodecError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(CodecError::InvalidTimestamp(millis))
}

/// Decode one snapshot payload into the domain model.
fn decode_snapshot(payload: SnapshotPayload) -> Result<BalanceSnapshot, CodecError> {
    Ok(BalanceSnapshot {
        entity_id: payload.id,
        timestamp: decode_timestamp(payload.day)?,
        balance: payload.balance,
        lower_bound: payload.lower_bound,
        upper_bound: payload.upper_bound,
    })
}

/// Decode one entity payload, normalizing the empty-color and
/// missing-group conventions.
fn decode_entity(payload: EntityPayload) -> Result<EntitySetup, CodecError> {
    let group = payload
        .group
        .filter(|group| !group.is_empty())
        .unwrap_or_else(|| payload.name.clone());

    let entity = Entity {
        id: payload.id,
        name: payload.name,
        color: payload.color.filter(|color| !color.is_empty()),
        group,
    };

    let snapshots = payload
        .snapshots
        .into_iter()
        .map(decode_snapshot)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EntitySetup { entity, snapshots })
}

fn decode_markline(payload: MarklinePayload) -> Result<Markline, CodecError> {
    Ok(Markline {
        name: payload.name,
        date: decode_timestamp(payload.date)?,
        color: payload.color.filter(|color| !color.is_empty()),
    })
}

fn decode_setup(payload: SetupPayload) -> Result<SetupEvent, CodecError> {
    Ok(SetupEvent {
        axis_max: decode_timestamp(payload.max)?,
        entities: payload
            .entities
            .into_iter()
            .map(decode_entity)
            .collect::<Result<Vec<_>, _>>()?,
        marklines: payload
            .marklines
            .into_iter()
            .map(decode_markline)
            .collect::<Result<Vec<_>, _>>()?,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use test_case::test_case;

    #[test]
    fn decode_snapshot_event() {
        let codec = JsonCodec::new();
        let frame = r#"{"event":"balanceSnapshot","data":{"id":"acc-1","day":1000,"balance":100,"lowerBound":90,"upperBound":110}}"#;

        match codec.decode(frame).unwrap() {
            ChartMessage::Snapshot(snap) => {
                assert_eq!(snap.entity_id, "acc-1");
                assert_eq!(snap.timestamp.timestamp_millis(), 1000);
                assert_eq!(snap.balance, Decimal::from(100));
                assert_eq!(snap.band_width(), Decimal::from(20));
            }
            other => panic!("expected Snapshot, got {other:?}"),
        }
    }

    #[test]
    fn decode_setup_event() {
        let codec = JsonCodec::new();
        let frame = r#"{
            "event": "setup",
            "data": {
                "max": 2000,
                "entities": [
                    {"id": "acc-1", "name": "Savings", "color": "", "snapshots": [
                        {"id": "acc-1", "day": 1, "balance": 10, "lowerBound": 9, "upperBound": 11}
                    ]},
                    {"id": "acc-2", "name": "Pension", "color": "#123456", "group": "Retirement"}
                ],
                "marklines": [{"name": "House", "date": 1500}]
            }
        }"#;

        match codec.decode(frame).unwrap() {
            ChartMessage::Setup(setup) => {
                assert_eq!(setup.axis_max.timestamp_millis(), 2000);
                assert_eq!(setup.entities.len(), 2);

                let savings = &setup.entities[0];
                // Empty color means palette assignment; missing group
                // defaults to the name.
                assert!(savings.entity.color.is_none());
                assert_eq!(savings.entity.group, "Savings");
                assert_eq!(savings.snapshots.len(), 1);

                let pension = &setup.entities[1];
                assert_eq!(pension.entity.color.as_deref(), Some("#123456"));
                assert_eq!(pension.entity.group, "Retirement");
                assert!(pension.snapshots.is_empty());

                assert_eq!(setup.marklines.len(), 1);
                assert_eq!(setup.marklines[0].name, "House");
                assert_eq!(setup.marklines[0].date.timestamp_millis(), 1500);
                assert!(setup.marklines[0].color.is_none());
            }
            other => panic!("expected Setup, got {other:?}"),
        }
    }

    #[test]
    fn decode_close_event_without_data() {
        let codec = JsonCodec::new();
        assert!(matches!(
            codec.decode(r#"{"event":"close"}"#).unwrap(),
            ChartMessage::Close
        ));
    }

    #[test_case(r"not json at all"; "unparseable frame")]
    #[test_case(r#"{"data":{}}"#; "missing event name")]
    #[test_case(r#"{"event":"balanceSnapshot","data":{"id":"acc-1"}}"#; "payload of wrong shape")]
    #[test_case(r#"{"event":"balanceSnapshot"}"#; "snapshot without payload")]
    #[test_case(r#"{"event":"setup","data":{"entities":[]}}"#; "setup missing max")]
    fn malformed_frames_are_errors(frame: &str) {
        let codec = JsonCodec::new();
        assert!(codec.decode(frame).is_err());
    }

    #[test]
    fn unknown_event_is_an_error() {
        let codec = JsonCodec::new();
        let err = codec.decode(r#"{"event":"heartbeat"}"#).unwrap_err();
        assert!(matches!(err, CodecError::UnknownEvent(name) if name == "heartbeat"));
    }

    #[test]
    fn out_of_range_timestamp_is_an_error() {
        let codec = JsonCodec::new();
        let frame = format!(
            r#"{{"event":"balanceSnapshot","data":{{"id":"acc-1","day":{},"balance":1,"lowerBound":0,"upperBound":2}}}}"#,
            i64::MAX
        );
        assert!(matches!(
            codec.decode(&frame).unwrap_err(),
            CodecError::InvalidTimestamp(_)
        ));
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let codec = JsonCodec::new();
        assert!(codec.decode("  {\"event\":\"close\"}\n").is_ok());
    }
}
