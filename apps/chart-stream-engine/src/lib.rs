#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Chart Stream Engine - Balance Projection Aggregation
//!
//! Consumes a continuous stream of per-entity balance projection snapshots,
//! maintains derived chart series (center line plus confidence band per
//! entity), coalesces bursts into throttled full-state render commands, and
//! keeps grouped legend selection consistent.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure chart series logic
//!   - `series`: entities, snapshots, channels, palette, marklines
//!   - `aggregator`: streaming aggregation into render-ready channels
//!   - `legend`: legend-group selection reconciliation
//!
//! - **Application**: Orchestration
//!   - `ports`: port boundaries for stream source, renderer, and theme
//!   - `session`: stream session state machine and batch scheduling
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `stream`: WebSocket client and JSON codec for the event stream
//!   - `render`: broadcast hub for render commands
//!   - `theme`: color-token provider with fixed fallbacks
//!   - `config`: environment-driven settings
//!   - `health`: health check HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//! Chart stream WS ──► Session ──► Aggregator
//!                       │            │
//!                  batch timer   channels
//!                       │            │
//!                       └───► Render Hub ──► Renderer 1..N
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core chart series types with no external dependencies.
pub mod domain;

/// Application layer - Session orchestration and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::aggregator::{AggregatorError, AggregatorStats, ChannelMeta, SeriesAggregator};
pub use domain::legend::{SelectionCommand, reconcile};
pub use domain::series::{
    BalanceSnapshot, ChannelKind, Entity, EntityId, Markline, SeriesChannel, SeriesPoint,
};

// Session
pub use application::session::{
    SessionState, SessionStatus, StreamSession, scheduler::BatchScheduler,
};

// Infrastructure config
pub use infrastructure::config::{
    BatchSettings, ConfigError, EngineConfig, RenderSettings, ServerSettings, TransportSettings,
};

// Stream transport (for integration tests)
pub use infrastructure::stream::{
    ChartMessage, ChartStreamClient, ChartStreamConfig, CodecError, EntitySetup, JsonCodec,
    RetryConfig, RetryPolicy, SetupEvent, StreamClientError, StreamEvent,
};

// Render hub (for integration tests)
pub use infrastructure::render::{
    ChartConfiguration, RenderCommand, RenderHub, RenderHubConfig, SelectionChanged,
    SharedRenderHub,
};

// Theme
pub use infrastructure::theme::{EnvTheme, ThemeColors, ThemeSource, ThemeToken};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::{CommandKind as MetricsCommandKind, init_metrics};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
