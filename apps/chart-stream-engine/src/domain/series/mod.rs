//! Chart Series Types
//!
//! Canonical domain types for the balance projection chart: tracked
//! entities, balance snapshots with confidence intervals, the three series
//! channels derived from each entity, and static markline annotations.
//!
//! # Channel Derivation
//!
//! Every snapshot contributes one point to each of its entity's channels:
//!
//! - `Main` carries the central balance estimate.
//! - `BandLower` carries the lower confidence bound; it is rendered
//!   invisibly and only serves as the stack base for the band.
//! - `BandWidth` carries `upper - lower` and is rendered as a filled area
//!   stacked on top of `BandLower`, producing the shaded confidence band.
//!
//! Inverted bounds (`upper < lower`) are clamped to zero band width rather
//! than dropped, keeping the stream monotone against recoverable input.

pub mod palette;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

// =============================================================================
// Entities
// =============================================================================

/// Unique key of a tracked financial entity.
pub type EntityId = String;

/// One tracked financial subject whose balance is projected over time.
///
/// Created once per stream setup and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Unique entity key.
    pub id: EntityId,
    /// Display name, also the legend entry for the entity's channel group.
    pub name: String,
    /// Explicit line color; a palette color is assigned when absent.
    pub color: Option<String>,
    /// Legend cluster key shared by the entity's three channels.
    pub group: String,
}

// =============================================================================
// Snapshots
// =============================================================================

/// One observed or forecast balance data point for an entity.
///
/// Arrives continuously; never mutated, only appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSnapshot {
    /// Entity the snapshot belongs to.
    pub entity_id: EntityId,
    /// Point in time, used as the X coordinate.
    pub timestamp: DateTime<Utc>,
    /// Central balance estimate.
    pub balance: Decimal,
    /// Lower confidence bound.
    pub lower_bound: Decimal,
    /// Upper confidence bound. Expected to be `>= lower_bound`.
    pub upper_bound: Decimal,
}

impl BalanceSnapshot {
    /// Check whether the confidence bounds are inverted.
    #[must_use]
    pub fn has_inverted_bounds(&self) -> bool {
        self.upper_bound < self.lower_bound
    }

    /// Width of the confidence band, clamped to zero for inverted bounds.
    #[must_use]
    pub fn band_width(&self) -> Decimal {
        (self.upper_bound - self.lower_bound).max(Decimal::ZERO)
    }

    /// The value this snapshot contributes to a channel of the given kind.
    #[must_use]
    pub fn channel_value(&self, kind: ChannelKind) -> Decimal {
        match kind {
            ChannelKind::Main => self.balance,
            ChannelKind::BandLower => self.lower_bound,
            ChannelKind::BandWidth => self.band_width(),
        }
    }
}

// =============================================================================
// Channels
// =============================================================================

/// The three renderable series derived from one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelKind {
    /// Center line carrying the balance estimate.
    Main,
    /// Invisible stack base carrying the lower bound.
    BandLower,
    /// Filled band carrying the bound spread, stacked on `BandLower`.
    BandWidth,
}

impl ChannelKind {
    /// All channel kinds in render order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Main, Self::BandLower, Self::BandWidth]
    }

    /// Channel id for an entity, following the `{id}`/`{id}_min`/`{id}_max`
    /// wire convention.
    #[must_use]
    pub fn channel_id(self, entity_id: &str) -> String {
        match self {
            Self::Main => entity_id.to_string(),
            Self::BandLower => format!("{entity_id}_min"),
            Self::BandWidth => format!("{entity_id}_max"),
        }
    }

    /// Display name for an entity's channel of this kind.
    #[must_use]
    pub fn display_name(self, entity_name: &str) -> String {
        match self {
            Self::Main => entity_name.to_string(),
            Self::BandLower => format!("{entity_name} min"),
            Self::BandWidth => format!("{entity_name} max"),
        }
    }
}

/// One `(timestamp, value)` pair of a series channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// X coordinate.
    pub timestamp: DateTime<Utc>,
    /// Y coordinate.
    pub value: Decimal,
}

/// A renderable series channel with its full point history and style.
///
/// Points are append-only; insertion order is arrival order. Per-entity
/// timestamp monotonicity is the producer's responsibility; points are
/// never re-sorted or deduplicated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesChannel {
    /// Stable channel id.
    pub id: String,
    /// Display name shown in tooltips (band channels stay out of the legend).
    pub name: String,
    /// Which of the three derived series this is.
    pub kind: ChannelKind,
    /// Legend cluster key, shared with the sibling channels.
    pub group: String,
    /// Line color; `None` for the invisible band channels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Translucent area fill; set only on the band-width channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_color: Option<String>,
    /// Stack key tying the two band channels together.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Full point history in arrival order.
    pub points: Vec<SeriesPoint>,
}

impl SeriesChannel {
    /// Create an empty channel of the given kind for an entity.
    #[must_use]
    pub fn for_entity(entity: &Entity, kind: ChannelKind, line_color: &str) -> Self {
        let stack = match kind {
            ChannelKind::Main => None,
            ChannelKind::BandLower | ChannelKind::BandWidth => {
                Some(format!("{}-confidence-band", entity.id))
            }
        };
        Self {
            id: kind.channel_id(&entity.id),
            name: kind.display_name(&entity.name),
            kind,
            group: entity.group.clone(),
            color: match kind {
                ChannelKind::Main => Some(line_color.to_string()),
                ChannelKind::BandLower | ChannelKind::BandWidth => None,
            },
            area_color: match kind {
                ChannelKind::BandWidth => Some(palette::band_fill(line_color)),
                ChannelKind::Main | ChannelKind::BandLower => None,
            },
            stack,
            points: Vec::new(),
        }
    }

    /// Append one point in arrival order.
    pub fn push(&mut self, timestamp: DateTime<Utc>, value: Decimal) {
        self.points.push(SeriesPoint { timestamp, value });
    }
}

// =============================================================================
// Marklines
// =============================================================================

/// A static vertical annotation overlaid on the chart, independent of the
/// streamed series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Markline {
    /// Label shown next to the line.
    pub name: String,
    /// Date the line is drawn at.
    pub date: DateTime<Utc>,
    /// Line color; renderers fall back to their annotation default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
