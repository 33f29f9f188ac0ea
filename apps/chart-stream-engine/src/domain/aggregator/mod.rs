//! Series Aggregator
//!
//! Converts the incoming snapshot stream into the three series channels per
//! entity and appends points in arrival order. The aggregator exclusively
//! owns the channel map for the lifetime of one stream session; the state is
//! discarded with the session and never persisted across streams.
//!
//! # Design
//!
//! - Registration order is stable and drives both palette assignment and
//!   the channel order of every flush.
//! - Re-registering a known entity id is an idempotent no-op and does not
//!   advance the palette cursor.
//! - Appends require prior registration; snapshots for unknown entities are
//!   rejected with [`AggregatorError::UnknownEntity`] and handled (dropped
//!   and logged) by the caller.

use std::collections::HashMap;

use super::series::{
    BalanceSnapshot, ChannelKind, Entity, EntityId, SeriesChannel, palette,
};

// =============================================================================
// Errors
// =============================================================================

/// Aggregation errors.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    /// A snapshot referenced an entity id that was never registered.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),
}

// =============================================================================
// Per-Entity Series
// =============================================================================

/// The channel triple backing one entity, in render order
/// (main, band-lower, band-width).
#[derive(Debug, Clone)]
struct EntitySeries {
    channels: [SeriesChannel; 3],
}

impl EntitySeries {
    fn new(entity: &Entity, line_color: &str) -> Self {
        Self {
            channels: [
                SeriesChannel::for_entity(entity, ChannelKind::Main, line_color),
                SeriesChannel::for_entity(entity, ChannelKind::BandLower, line_color),
                SeriesChannel::for_entity(entity, ChannelKind::BandWidth, line_color),
            ],
        }
    }

    fn append(&mut self, snapshot: &BalanceSnapshot) {
        for channel in &mut self.channels {
            channel.push(snapshot.timestamp, snapshot.channel_value(channel.kind));
        }
    }
}

// =============================================================================
// Channel Metadata
// =============================================================================

/// Cheap per-channel metadata for legend reconciliation, without the point
/// history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMeta {
    /// Channel display name (the key the renderer selects by).
    pub name: String,
    /// Legend cluster key of the owning entity.
    pub group: String,
}

// =============================================================================
// Statistics
// =============================================================================

/// Aggregator state statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregatorStats {
    /// Number of registered entities.
    pub entity_count: usize,
    /// Number of channels (three per entity).
    pub channel_count: usize,
    /// Total points across all channels.
    pub point_count: usize,
}

// =============================================================================
// Outcome
// =============================================================================

/// Result of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// The snapshot's bounds were inverted and the band width was clamped
    /// to zero.
    pub clamped: bool,
}

// =============================================================================
// Series Aggregator
// =============================================================================

/// Streaming aggregation state for one chart session.
///
/// # Example
///
/// ```rust
/// use chart_stream_engine::domain::aggregator::SeriesAggregator;
/// use chart_stream_engine::domain::series::Entity;
///
/// let mut aggregator = SeriesAggregator::new();
/// let registered = aggregator.register_entity(Entity {
///     id: "acc-1".to_string(),
///     name: "Savings".to_string(),
///     color: None,
///     group: "Savings".to_string(),
/// });
/// assert!(registered);
/// assert_eq!(aggregator.current_channels().len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct SeriesAggregator {
    /// Entity ids in registration order.
    order: Vec<EntityId>,
    /// Channel state per entity.
    entities: HashMap<EntityId, EntitySeries>,
}

impl SeriesAggregator {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity, creating its three channels if absent.
    ///
    /// Entities without an explicit color get the palette color of their
    /// registration index; an explicit color still occupies its slot.
    /// Returns `false` for an already-known id (idempotent no-op, no slot
    /// consumed).
    pub fn register_entity(&mut self, entity: Entity) -> bool {
        if self.entities.contains_key(&entity.id) {
            return false;
        }

        let line_color = entity
            .color
            .clone()
            .unwrap_or_else(|| palette::line_color(self.order.len()).to_string());

        self.order.push(entity.id.clone());
        self.entities
            .insert(entity.id.clone(), EntitySeries::new(&entity, &line_color));
        true
    }

    /// Append one snapshot, contributing a point to each of the entity's
    /// three channels.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError::UnknownEntity`] if the entity was never
    /// registered; channel state is unchanged in that case.
    pub fn append_snapshot(
        &mut self,
        snapshot: &BalanceSnapshot,
    ) -> Result<AppendOutcome, AggregatorError> {
        let series = self
            .entities
            .get_mut(&snapshot.entity_id)
            .ok_or_else(|| AggregatorError::UnknownEntity(snapshot.entity_id.clone()))?;

        series.append(snapshot);

        Ok(AppendOutcome {
            clamped: snapshot.has_inverted_bounds(),
        })
    }

    /// Check whether an entity id is registered.
    #[must_use]
    pub fn contains(&self, entity_id: &str) -> bool {
        self.entities.contains_key(entity_id)
    }

    /// Full current state of all channels in stable registration order
    /// (per entity: main, band-lower, band-width).
    ///
    /// Never mutates state; every flush retransmits the complete history,
    /// which keeps the renderer contract at "replace with latest state".
    #[must_use]
    pub fn current_channels(&self) -> Vec<SeriesChannel> {
        self.order
            .iter()
            .filter_map(|id| self.entities.get(id))
            .flat_map(|series| series.channels.iter().cloned())
            .collect()
    }

    /// Per-channel legend metadata in stable registration order.
    #[must_use]
    pub fn channel_meta(&self) -> Vec<ChannelMeta> {
        self.order
            .iter()
            .filter_map(|id| self.entities.get(id))
            .flat_map(|series| {
                series.channels.iter().map(|channel| ChannelMeta {
                    name: channel.name.clone(),
                    group: channel.group.clone(),
                })
            })
            .collect()
    }

    /// Current state statistics.
    #[must_use]
    pub fn stats(&self) -> AggregatorStats {
        let point_count = self
            .entities
            .values()
            .flat_map(|series| series.channels.iter())
            .map(|channel| channel.points.len())
            .sum();

        AggregatorStats {
            entity_count: self.order.len(),
            channel_count: self.order.len() * ChannelKind::all().len(),
            point_count,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
