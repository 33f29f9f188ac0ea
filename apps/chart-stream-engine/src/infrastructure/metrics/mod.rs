//! Prometheus Metrics Module
//!
//! Exposes pipeline metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Ingestion**: snapshots received, dropped, and clamped
//! - **Rendering**: render commands emitted by kind
//! - **Transport**: malformed frames and reconnection attempts
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "chart_stream_snapshots_received_total",
        "Total balance snapshots accepted into the aggregator"
    );
    describe_counter!(
        "chart_stream_snapshots_dropped_total",
        "Total snapshots dropped for referencing an unregistered entity"
    );
    describe_counter!(
        "chart_stream_band_clamped_total",
        "Total snapshots whose inverted bounds were clamped to zero width"
    );
    describe_counter!(
        "chart_stream_render_commands_total",
        "Total render commands emitted, by kind"
    );
    describe_counter!(
        "chart_stream_malformed_frames_total",
        "Total stream frames dropped as malformed"
    );
    describe_counter!(
        "chart_stream_reconnects_total",
        "Total transport reconnection attempts"
    );
    describe_gauge!(
        "chart_stream_channels",
        "Number of series channels in the current session"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric labels for render command kinds.
#[derive(Debug, Clone, Copy)]
pub enum CommandKind {
    /// One-off chart configuration.
    Configure,
    /// Full series state replacement.
    ReplaceSeries,
    /// Corrective legend selection.
    SetSelection,
}

impl CommandKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::ReplaceSeries => "replace_series",
            Self::SetSelection => "set_selection",
        }
    }
}

/// Record a snapshot accepted into the aggregator.
pub fn record_snapshot_received() {
    counter!("chart_stream_snapshots_received_total").increment(1);
}

/// Record a snapshot dropped for an unregistered entity.
pub fn record_snapshot_dropped() {
    counter!("chart_stream_snapshots_dropped_total").increment(1);
}

/// Record a snapshot whose band width was clamped to zero.
pub fn record_band_clamped() {
    counter!("chart_stream_band_clamped_total").increment(1);
}

/// Record an emitted render command.
pub fn record_render_command(kind: CommandKind) {
    counter!(
        "chart_stream_render_commands_total",
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record a stream frame dropped as malformed.
pub fn record_malformed_payload() {
    counter!("chart_stream_malformed_frames_total").increment(1);
}

/// Record a transport reconnection attempt.
pub fn record_reconnect() {
    counter!("chart_stream_reconnects_total").increment(1);
}

/// Update the channel count for the current session.
pub fn set_channel_count(count: f64) {
    gauge!("chart_stream_channels").set(count);
}

// =============================================================================
// Tests
// =============================================================================
