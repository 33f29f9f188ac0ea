//! Session Pipeline Integration Tests
//!
//! Drives a full `StreamSession` through its public API with simulated
//! transport events and paused time, asserting the batched-render and
//! lifecycle guarantees end to end.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use chart_stream_engine::{
    BalanceSnapshot, ChartMessage, Entity, EntitySetup, RenderCommand, RenderHub, SelectionChanged,
    SessionState, SetupEvent, StreamEvent, StreamSession, ThemeColors,
};

const BATCH_INTERVAL: Duration = Duration::from_millis(100);

struct Harness {
    event_tx: mpsc::Sender<StreamEvent>,
    selection_tx: mpsc::Sender<SelectionChanged>,
    commands: tokio::sync::broadcast::Receiver<RenderCommand>,
    status: Arc<chart_stream_engine::SessionStatus>,
    session: tokio::task::JoinHandle<()>,
}

fn spawn_session() -> Harness {
    let hub = Arc::new(RenderHub::with_defaults());
    let session = StreamSession::new(
        BATCH_INTERVAL,
        Arc::clone(&hub),
        ThemeColors::default(),
        CancellationToken::new(),
    );
    let status = session.status();

    let (event_tx, event_rx) = mpsc::channel(64);
    let (selection_tx, selection_rx) = mpsc::channel(8);
    let commands = hub.commands_rx();
    let handle = tokio::spawn(session.run(event_rx, selection_rx));

    Harness {
        event_tx,
        selection_tx,
        commands,
        status,
        session: handle,
    }
}

fn snapshot(id: &str, day: i64, balance: i64, lower: i64, upper: i64) -> BalanceSnapshot {
    BalanceSnapshot {
        entity_id: id.to_string(),
        timestamp: Utc.timestamp_millis_opt(day).unwrap(),
        balance: Decimal::from(balance),
        lower_bound: Decimal::from(lower),
        upper_bound: Decimal::from(upper),
    }
}

fn setup_message(ids: &[&str]) -> ChartMessage {
    ChartMessage::Setup(SetupEvent {
        entities: ids
            .iter()
            .map(|id| EntitySetup {
                entity: Entity {
                    id: (*id).to_string(),
                    name: (*id).to_string(),
                    color: None,
                    group: (*id).to_string(),
                },
                snapshots: vec![],
            })
            .collect(),
        axis_max: Utc.timestamp_millis_opt(1_000_000).unwrap(),
        marklines: vec![],
    })
}

async fn send(harness: &Harness, message: ChartMessage) {
    harness
        .event_tx
        .send(StreamEvent::Message(message))
        .await
        .expect("session should be running");
}

#[tokio::test(start_paused = true)]
async fn setup_produces_configure_and_immediate_render() {
    let mut harness = spawn_session();

    send(&harness, setup_message(&["acc-1", "acc-2"])).await;

    match harness.commands.recv().await.unwrap() {
        RenderCommand::Configure(config) => {
            assert_eq!(config.axis_max.timestamp_millis(), 1_000_000);
            assert_eq!(config.theme, ThemeColors::default());
        }
        other => panic!("expected Configure first, got {other:?}"),
    }

    // The initial render arrives without any timer tick.
    match harness.commands.recv().await.unwrap() {
        RenderCommand::ReplaceSeries(channels) => {
            assert_eq!(channels.len(), 6);
        }
        other => panic!("expected ReplaceSeries, got {other:?}"),
    }

    assert_eq!(harness.status.state(), SessionState::Active);
    harness.session.abort();
}

#[tokio::test(start_paused = true)]
async fn burst_of_snapshots_coalesces_into_one_render_per_tick() {
    let mut harness = spawn_session();

    send(&harness, setup_message(&["acc-1"])).await;
    let _configure = harness.commands.recv().await.unwrap();
    let _initial = harness.commands.recv().await.unwrap();

    for day in 1..=25 {
        send(&harness, ChartMessage::Snapshot(snapshot("acc-1", day, 100, 90, 110))).await;
    }

    // Exactly one ReplaceSeries for the whole burst, carrying all 25 points.
    match harness.commands.recv().await.unwrap() {
        RenderCommand::ReplaceSeries(channels) => {
            assert!(channels.iter().all(|c| c.points.len() == 25));
        }
        other => panic!("expected ReplaceSeries, got {other:?}"),
    }

    // The next command is the close's final flush; no further tick
    // renders happened in between.
    send(&harness, ChartMessage::Close).await;
    match harness.commands.recv().await.unwrap() {
        RenderCommand::ReplaceSeries(channels) => {
            assert!(channels.iter().all(|c| c.points.len() == 25));
        }
        other => panic!("expected final ReplaceSeries, got {other:?}"),
    }

    harness.session.await.unwrap();
    assert_eq!(harness.status.state(), SessionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn close_flushes_trailing_snapshot_before_terminal_state() {
    let mut harness = spawn_session();

    send(&harness, setup_message(&["acc-1"])).await;
    let _configure = harness.commands.recv().await.unwrap();
    let _initial = harness.commands.recv().await.unwrap();

    // Queue a snapshot and close back-to-back, faster than any tick.
    send(&harness, ChartMessage::Snapshot(snapshot("acc-1", 1, 100, 90, 110))).await;
    send(&harness, ChartMessage::Close).await;

    match harness.commands.recv().await.unwrap() {
        RenderCommand::ReplaceSeries(channels) => {
            assert!(channels.iter().all(|c| c.points.len() == 1));
        }
        other => panic!("expected final ReplaceSeries, got {other:?}"),
    }

    harness.session.await.unwrap();
    assert_eq!(harness.status.state(), SessionState::Closed);
    assert_eq!(harness.status.snapshots_received(), 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_confidence_band_points() {
    let mut harness = spawn_session();

    send(&harness, setup_message(&["E1"])).await;
    let _configure = harness.commands.recv().await.unwrap();
    let _initial = harness.commands.recv().await.unwrap();

    send(&harness, ChartMessage::Snapshot(snapshot("E1", 1, 100, 90, 110))).await;
    send(&harness, ChartMessage::Close).await;

    match harness.commands.recv().await.unwrap() {
        RenderCommand::ReplaceSeries(channels) => {
            let values: Vec<_> = channels
                .iter()
                .map(|c| (c.id.clone(), c.points[0].value))
                .collect();
            assert_eq!(
                values,
                vec![
                    ("E1".to_string(), Decimal::from(100)),
                    ("E1_min".to_string(), Decimal::from(90)),
                    ("E1_max".to_string(), Decimal::from(20)),
                ]
            );
            for channel in &channels {
                assert_eq!(channel.points[0].timestamp.timestamp_millis(), 1);
            }
        }
        other => panic!("expected ReplaceSeries, got {other:?}"),
    }

    harness.session.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unknown_entity_snapshot_emits_no_render() {
    let mut harness = spawn_session();

    send(&harness, setup_message(&["acc-1"])).await;
    let _configure = harness.commands.recv().await.unwrap();
    let _initial = harness.commands.recv().await.unwrap();

    send(&harness, ChartMessage::Snapshot(snapshot("ghost", 1, 1, 0, 2))).await;
    send(&harness, ChartMessage::Close).await;

    // The dropped snapshot scheduled no tick render; the next command is
    // the final flush with untouched channels.
    match harness.commands.recv().await.unwrap() {
        RenderCommand::ReplaceSeries(channels) => {
            assert!(channels.iter().all(|c| c.points.is_empty()));
        }
        other => panic!("expected final ReplaceSeries, got {other:?}"),
    }

    harness.session.await.unwrap();
    assert_eq!(harness.status.snapshots_dropped(), 1);
    assert_eq!(harness.status.snapshots_received(), 0);
}

#[tokio::test(start_paused = true)]
async fn events_after_close_are_discarded() {
    let harness = spawn_session();

    send(&harness, setup_message(&["acc-1"])).await;
    send(&harness, ChartMessage::Close).await;
    harness.session.await.unwrap();

    assert_eq!(harness.status.state(), SessionState::Closed);

    // The session released its receiver; late events have nowhere to go.
    assert!(
        harness
            .event_tx
            .send(StreamEvent::Message(ChartMessage::Snapshot(snapshot(
                "acc-1", 2, 1, 0, 2
            ))))
            .await
            .is_err()
    );
    assert_eq!(harness.status.snapshots_received(), 0);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_closes_with_best_effort_flush() {
    let mut harness = spawn_session();

    send(&harness, setup_message(&["acc-1"])).await;
    let _configure = harness.commands.recv().await.unwrap();
    let _initial = harness.commands.recv().await.unwrap();

    send(&harness, ChartMessage::Snapshot(snapshot("acc-1", 1, 100, 90, 110))).await;
    harness
        .event_tx
        .send(StreamEvent::Failed("connection refused".to_string()))
        .await
        .unwrap();

    match harness.commands.recv().await.unwrap() {
        RenderCommand::ReplaceSeries(channels) => {
            assert!(channels.iter().all(|c| c.points.len() == 1));
        }
        other => panic!("expected final ReplaceSeries, got {other:?}"),
    }

    harness.session.await.unwrap();
    assert_eq!(harness.status.state(), SessionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn transient_disconnects_do_not_close_the_session() {
    let harness = spawn_session();

    send(&harness, setup_message(&["acc-1"])).await;

    harness.event_tx.send(StreamEvent::Disconnected).await.unwrap();
    harness
        .event_tx
        .send(StreamEvent::Reconnecting { attempt: 1 })
        .await
        .unwrap();
    harness.event_tx.send(StreamEvent::Connected).await.unwrap();

    // Still ingesting after the transport blip.
    send(&harness, ChartMessage::Snapshot(snapshot("acc-1", 1, 100, 90, 110))).await;
    send(&harness, ChartMessage::Close).await;
    harness.session.await.unwrap();

    assert_eq!(harness.status.snapshots_received(), 1);
}

#[tokio::test(start_paused = true)]
async fn legend_toggle_converges_all_sibling_channels() {
    let mut harness = spawn_session();

    send(&harness, setup_message(&["acc-1", "acc-2"])).await;
    let _configure = harness.commands.recv().await.unwrap();
    let _initial = harness.commands.recv().await.unwrap();

    // The user hid acc-1's legend entry; acc-2 stays visible.
    harness
        .selection_tx
        .send(SelectionChanged {
            selected: std::collections::HashMap::from([
                ("acc-1".to_string(), false),
                ("acc-2".to_string(), true),
            ]),
        })
        .await
        .unwrap();

    let mut corrections = Vec::new();
    for _ in 0..6 {
        match harness.commands.recv().await.unwrap() {
            RenderCommand::SetSelection(cmd) => corrections.push(cmd),
            other => panic!("expected SetSelection, got {other:?}"),
        }
    }

    for correction in &corrections {
        let expect_visible = correction.channel.starts_with("acc-2");
        assert_eq!(correction.visible, expect_visible, "{}", correction.channel);
    }

    harness.session.abort();
}
