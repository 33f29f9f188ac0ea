//! Chart Stream Engine Binary
//!
//! Starts the balance projection stream engine: connects to the chart
//! event stream, aggregates snapshots into series channels, and emits
//! batched render commands as JSON lines on stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin chart-stream-engine
//! ```
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CHART_STREAM_URL`: Stream endpoint (default: ws://localhost:8080/chart/stream)
//! - `CHART_STREAM_QUERY`: Query filter appended to the endpoint
//! - `CHART_BATCH_INTERVAL_MS`: Render batch interval (default: 100)
//! - `CHART_HEALTH_PORT`: Health check HTTP port (default: 8083)
//! - `CHART_THEME_TEXT` / `CHART_THEME_BACKGROUND` / `CHART_THEME_BORDER` /
//!   `CHART_THEME_AXIS_LINE`: Theme color tokens
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: ledgerline-chart-stream-engine)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use chart_stream_engine::infrastructure::telemetry;
use chart_stream_engine::{
    ChartStreamClient, ChartStreamConfig, EngineConfig, EnvTheme, HealthServer, HealthServerState,
    RenderHub, RenderHubConfig, RetryConfig, SelectionChanged, StreamSession, ThemeColors,
    init_metrics,
};
use tokio::io::AsyncWriteExt;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Chart Stream Engine");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = EngineConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Render hub for command distribution
    let render_hub = Arc::new(RenderHub::new(RenderHubConfig {
        commands_capacity: config.render.commands_capacity,
    }));

    // Resolve theme tokens once; missing tokens fall back to defaults
    let theme = ThemeColors::resolve(&EnvTheme::new());

    // Session, constructed per stream and discarded on close
    let session = StreamSession::new(
        config.batch.interval,
        Arc::clone(&render_hub),
        theme,
        shutdown_token.clone(),
    );
    let session_status = session.status();

    // Health server
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        Arc::clone(&session_status),
        Arc::clone(&render_hub),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );

    // Stream client configuration
    let mut stream_config = ChartStreamConfig::new(config.transport.stream_url.clone());
    if let Some(query) = config.transport.stream_query.clone() {
        stream_config = stream_config.with_query(query);
    }
    stream_config.retry = RetryConfig {
        initial_delay: config.transport.reconnect_delay_initial,
        max_delay: config.transport.reconnect_delay_max,
        multiplier: config.transport.reconnect_delay_multiplier,
        jitter_factor: 0.1,
        max_attempts: config.transport.max_reconnect_attempts,
    };

    // Event channels. Selection notifications come from an embedding
    // renderer; the stdout binary has none attached.
    let (event_tx, event_rx) = mpsc::channel(config.transport.events_capacity);
    let (_selection_tx, selection_rx) =
        mpsc::channel::<SelectionChanged>(config.render.selections_capacity);

    let client = Arc::new(ChartStreamClient::new(
        stream_config,
        event_tx,
        shutdown_token.clone(),
    ));

    // Spawn the stdout renderer consumer
    let render_rx = render_hub.commands_rx();
    tokio::spawn(async move {
        write_render_commands(render_rx).await;
    });

    // Spawn the session
    let session_handle = tokio::spawn(session.run(event_rx, selection_rx));

    // Spawn the stream client
    tokio::spawn(async move {
        if let Err(e) = client.run().await {
            tracing::error!(error = %e, "Stream client error");
        }
    });

    // Spawn health server
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    tracing::info!("Chart stream engine ready");

    tokio::select! {
        () = await_shutdown_signal() => {
            shutdown_token.cancel();
        }
        result = session_handle => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Session task failed");
            }
            tracing::info!("Session finished, shutting down");
            shutdown_token.cancel();
        }
    }

    tracing::info!("Chart stream engine stopped");
    Ok(())
}

/// Serialize render commands as JSON lines on stdout.
async fn write_render_commands(
    rx: tokio::sync::broadcast::Receiver<chart_stream_engine::RenderCommand>,
) {
    let mut stream = BroadcastStream::new(rx);
    let mut stdout = tokio::io::stdout();

    while let Some(item) = stream.next().await {
        match item {
            Ok(command) => match serde_json::to_vec(&command) {
                Ok(mut line) => {
                    line.push(b'\n');
                    if stdout.write_all(&line).await.is_err() {
                        tracing::warn!("stdout closed, stopping render output");
                        return;
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to serialize render command"),
            },
            Err(e) => {
                // Lagged consumer: the next ReplaceSeries carries full state.
                tracing::warn!(error = %e, "Render consumer lagging");
            }
        }
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &EngineConfig) {
    tracing::info!(
        stream_url = %config.transport.stream_url,
        batch_interval_ms = config.batch.interval.as_millis(),
        health_port = config.server.health_port,
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
