//! Stream Session
//!
//! State machine over the event-stream lifecycle
//! (`Connecting → Active → Closed`) that drives the aggregation pipeline:
//! transport events mutate the aggregator, the batch timer coalesces bursts
//! into throttled full-state render commands, and renderer selection
//! notifications are reconciled into corrective selection commands.
//!
//! # Concurrency
//!
//! The session owns all aggregation state exclusively and multiplexes its
//! inputs with `tokio::select!` on one task, so ingestion and flush never
//! race and no lock guards the channel map. Shutdown cancellation and the
//! stream's own `close` event both end the loop deterministically; the
//! interval is dropped with it, leaving no orphaned timers.

pub mod scheduler;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::aggregator::{AggregatorError, SeriesAggregator};
use crate::domain::legend;
use crate::domain::series::BalanceSnapshot;
use crate::infrastructure::metrics::{self, CommandKind};
use crate::infrastructure::render::{
    ChartConfiguration, RenderCommand, SelectionChanged, SharedRenderHub,
};
use crate::infrastructure::stream::{ChartMessage, SetupEvent, StreamEvent};
use crate::infrastructure::theme::ThemeColors;
use self::scheduler::BatchScheduler;

// =============================================================================
// Session State
// =============================================================================

/// Lifecycle state of one stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Waiting for the stream's setup message.
    Connecting,
    /// Setup applied; ingesting live snapshots.
    Active,
    /// Terminal; no further events are processed.
    Closed,
}

impl SessionState {
    /// Get the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

// =============================================================================
// Session Status
// =============================================================================

/// Observability snapshot of a session, shared with the health endpoint.
#[derive(Debug)]
pub struct SessionStatus {
    session_id: Uuid,
    state: RwLock<SessionState>,
    snapshots_received: AtomicU64,
    snapshots_dropped: AtomicU64,
    flushes: AtomicU64,
    last_flush: RwLock<Option<DateTime<Utc>>>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStatus {
    /// Create status for a fresh session in `Connecting`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: RwLock::new(SessionState::Connecting),
            snapshots_received: AtomicU64::new(0),
            snapshots_dropped: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            last_flush: RwLock::new(None),
        }
    }

    /// Unique id of this session.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Set the lifecycle state.
    pub fn set_state(&self, state: SessionState) {
        *self.state.write() = state;
    }

    /// Record an accepted snapshot.
    pub fn record_snapshot(&self) {
        self.snapshots_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped snapshot.
    pub fn record_dropped(&self) {
        self.snapshots_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a flush.
    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        *self.last_flush.write() = Some(Utc::now());
    }

    /// Snapshots accepted so far.
    #[must_use]
    pub fn snapshots_received(&self) -> u64 {
        self.snapshots_received.load(Ordering::Relaxed)
    }

    /// Snapshots dropped so far.
    #[must_use]
    pub fn snapshots_dropped(&self) -> u64 {
        self.snapshots_dropped.load(Ordering::Relaxed)
    }

    /// Flushes performed so far.
    #[must_use]
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Time of the most recent flush.
    #[must_use]
    pub fn last_flush(&self) -> Option<DateTime<Utc>> {
        *self.last_flush.read()
    }
}

// =============================================================================
// Stream Session
// =============================================================================

/// One chart stream session.
///
/// Constructed per stream; the aggregation state lives and dies with it
/// (no cross-session persistence, no process-wide singleton).
pub struct StreamSession {
    aggregator: SeriesAggregator,
    scheduler: BatchScheduler,
    render: SharedRenderHub,
    theme: ThemeColors,
    status: Arc<SessionStatus>,
    cancel: CancellationToken,
}

impl StreamSession {
    /// Create a session in `Connecting`.
    #[must_use]
    pub fn new(
        batch_interval: std::time::Duration,
        render: SharedRenderHub,
        theme: ThemeColors,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            aggregator: SeriesAggregator::new(),
            scheduler: BatchScheduler::new(batch_interval),
            render,
            theme,
            status: Arc::new(SessionStatus::new()),
            cancel,
        }
    }

    /// Shared status handle for observability.
    #[must_use]
    pub fn status(&self) -> Arc<SessionStatus> {
        Arc::clone(&self.status)
    }

    /// Run the session until the stream closes, the transport fails, or
    /// shutdown is requested.
    ///
    /// Events are processed strictly in delivery order; a flush always
    /// reflects every snapshot processed before it was scheduled.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<StreamEvent>,
        mut selections: mpsc::Receiver<SelectionChanged>,
    ) {
        let mut ticker = tokio::time::interval(self.scheduler.interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut selections_open = true;

        tracing::info!(session_id = %self.status.session_id(), "Chart session connecting");

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    self.close("shutdown requested");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        if self.handle_event(event) {
                            break;
                        }
                    }
                    None => {
                        self.close("transport event channel closed");
                        break;
                    }
                },
                change = selections.recv(), if selections_open => match change {
                    Some(change) => self.handle_selection(&change),
                    None => selections_open = false,
                },
                _ = ticker.tick() => self.on_tick(),
            }
        }
    }

    /// Handle one transport event. Returns `true` when the session is done.
    fn handle_event(&mut self, event: StreamEvent) -> bool {
        match event {
            StreamEvent::Connected => {
                tracing::info!("Transport connected");
                false
            }
            StreamEvent::Disconnected => {
                tracing::warn!("Transport disconnected, awaiting reconnect");
                false
            }
            StreamEvent::Reconnecting { attempt } => {
                tracing::info!(attempt, "Transport reconnecting");
                false
            }
            StreamEvent::Message(message) => self.handle_message(message),
            StreamEvent::Failed(reason) => {
                tracing::error!(reason = %reason, "Transport failed");
                self.close("transport failure");
                true
            }
        }
    }

    /// Dispatch one decoded stream message. Returns `true` when the session
    /// is done.
    fn handle_message(&mut self, message: ChartMessage) -> bool {
        match message {
            ChartMessage::Setup(setup) => {
                match self.status.state() {
                    SessionState::Connecting => self.apply_setup(setup),
                    SessionState::Active => {
                        tracing::warn!("Discarding duplicate setup for active session");
                    }
                    SessionState::Closed => {}
                }
                false
            }
            ChartMessage::Snapshot(snapshot) => {
                match self.status.state() {
                    SessionState::Active => self.append_snapshot(&snapshot),
                    SessionState::Connecting => {
                        tracing::warn!(
                            entity = %snapshot.entity_id,
                            "Dropping snapshot received before setup"
                        );
                    }
                    SessionState::Closed => {}
                }
                false
            }
            ChartMessage::Close => {
                self.close("stream close event");
                true
            }
        }
    }

    /// Apply the setup message: register entities, replay embedded history,
    /// configure the chart, and render immediately.
    fn apply_setup(&mut self, setup: SetupEvent) {
        let entity_count = setup.entities.len();
        for entity_setup in setup.entities {
            self.aggregator.register_entity(entity_setup.entity);
            for snapshot in &entity_setup.snapshots {
                self.append_snapshot(snapshot);
            }
        }

        self.status.set_state(SessionState::Active);
        #[allow(clippy::cast_precision_loss)]
        metrics::set_channel_count(self.aggregator.stats().channel_count as f64);

        self.send_command(
            RenderCommand::Configure(ChartConfiguration {
                axis_max: setup.axis_max,
                today: Utc::now(),
                marklines: setup.marklines,
                theme: self.theme.clone(),
            }),
            CommandKind::Configure,
        );

        // The initial render must not wait for the first timer tick.
        self.flush_now();

        tracing::info!(entities = entity_count, "Chart session active");
    }

    /// Append one snapshot, marking the scheduler dirty on success.
    fn append_snapshot(&mut self, snapshot: &BalanceSnapshot) {
        match self.aggregator.append_snapshot(snapshot) {
            Ok(outcome) => {
                self.scheduler.record_appended(1);
                self.status.record_snapshot();
                metrics::record_snapshot_received();
                if outcome.clamped {
                    metrics::record_band_clamped();
                    tracing::warn!(
                        entity = %snapshot.entity_id,
                        "Inverted bounds clamped to zero band width"
                    );
                }
            }
            Err(AggregatorError::UnknownEntity(id)) => {
                self.status.record_dropped();
                metrics::record_snapshot_dropped();
                tracing::warn!(entity = %id, "Dropping snapshot for unknown entity");
            }
        }
    }

    /// Reconcile a renderer selection change into corrective commands.
    fn handle_selection(&mut self, change: &SelectionChanged) {
        let commands = legend::reconcile(&change.selected, &self.aggregator.channel_meta());
        for command in commands {
            self.send_command(RenderCommand::SetSelection(command), CommandKind::SetSelection);
        }
    }

    /// Timer tick: flush if anything was appended since the last flush.
    fn on_tick(&mut self) {
        if self.scheduler.on_tick() {
            self.emit_series();
        }
    }

    /// Unconditional flush (initial render and session close).
    fn flush_now(&mut self) {
        self.scheduler.force_flush();
        self.emit_series();
    }

    /// Emit the full current channel state as one render command.
    fn emit_series(&mut self) {
        let channels = self.aggregator.current_channels();
        self.status.record_flush();
        self.send_command(RenderCommand::ReplaceSeries(channels), CommandKind::ReplaceSeries);
    }

    /// Close the session with one final unconditional flush.
    ///
    /// Idempotent; the flush runs before the state flips so no trailing
    /// snapshot is lost.
    fn close(&mut self, reason: &str) {
        if self.status.state() == SessionState::Closed {
            return;
        }

        self.flush_now();
        self.status.set_state(SessionState::Closed);
        tracing::info!(
            session_id = %self.status.session_id(),
            reason,
            snapshots = self.status.snapshots_received(),
            flushes = self.scheduler.flush_count(),
            "Chart session closed"
        );
    }

    fn send_command(&self, command: RenderCommand, kind: CommandKind) {
        metrics::record_render_command(kind);
        if self.render.send(command).is_none() {
            tracing::trace!("No render consumers attached");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
