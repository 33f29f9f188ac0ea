//! Chart Stream WebSocket Client
//!
//! Connects to the balance projection stream endpoint and delivers decoded
//! [`ChartMessage`]s to the session over an mpsc channel.
//!
//! The client owns transport-level resilience: connection failures are
//! retried with exponential backoff and the session only learns about them
//! through `Disconnected`/`Reconnecting` status events. A server-sent
//! `close` message ends the stream gracefully; exhausted retries surface as
//! a single `Failed` event.
//!
//! There is deliberately no read timeout: a stalled transport simply
//! delivers no further events and the chart stays frozen at the last flush.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::backoff::{RetryConfig, RetryPolicy};
use super::codec::JsonCodec;
use super::messages::ChartMessage;
use crate::infrastructure::metrics;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur in the stream client.
#[derive(Debug, thiserror::Error)]
pub enum StreamClientError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server dropped the connection without a `close` event.
    #[error("connection closed")]
    ConnectionClosed,

    /// Reconnection attempts are exhausted.
    #[error("reconnection attempts exhausted")]
    RetriesExhausted,
}

// =============================================================================
// Events
// =============================================================================

/// Events delivered to the session.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Transport connected.
    Connected,
    /// Transport dropped; reconnection may follow.
    Disconnected,
    /// Reconnecting to the endpoint.
    Reconnecting {
        /// Reconnection attempt number.
        attempt: u32,
    },
    /// A decoded stream message.
    Message(ChartMessage),
    /// Transport failed permanently.
    Failed(String),
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the stream client.
#[derive(Debug, Clone)]
pub struct ChartStreamConfig {
    /// WebSocket endpoint of the chart stream.
    pub url: String,
    /// Query filter forwarded from the page, without the leading `?`.
    pub query: Option<String>,
    /// Reconnection backoff configuration.
    pub retry: RetryConfig,
}

impl ChartStreamConfig {
    /// Create a configuration for an endpoint.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: None,
            retry: RetryConfig::default(),
        }
    }

    /// Attach the page's query filter.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = (!query.is_empty()).then_some(query);
        self
    }

    /// Full endpoint including the query filter.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.query
            .as_ref()
            .map_or_else(|| self.url.clone(), |query| format!("{}?{query}", self.url))
    }
}

// =============================================================================
// Client
// =============================================================================

/// How one established connection ended.
enum ConnectionEnd {
    /// The server sent its `close` event; the stream is complete.
    StreamComplete,
    /// Shutdown was requested.
    Cancelled,
}

/// WebSocket client for the chart event stream.
pub struct ChartStreamClient {
    config: ChartStreamConfig,
    codec: JsonCodec,
    event_tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
}

impl ChartStreamClient {
    /// Create a new client.
    #[must_use]
    pub fn new(
        config: ChartStreamConfig,
        event_tx: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            codec: JsonCodec::new(),
            event_tx,
            cancel,
        }
    }

    /// Run the connection loop until the stream completes, shutdown is
    /// requested, or reconnection attempts are exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`StreamClientError::RetriesExhausted`] when the backoff
    /// policy gives up; transient connection errors are retried internally.
    pub async fn run(self: Arc<Self>) -> Result<(), StreamClientError> {
        let mut policy = RetryPolicy::new(self.config.retry.clone());

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Stream client cancelled");
                return Ok(());
            }

            match self.connect_and_stream(&mut policy).await {
                Ok(ConnectionEnd::StreamComplete) => {
                    tracing::info!("Chart stream completed");
                    return Ok(());
                }
                Ok(ConnectionEnd::Cancelled) => return Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, "Chart stream connection error");
                    let _ = self.event_tx.send(StreamEvent::Disconnected).await;

                    if let Some(delay) = policy.next_delay() {
                        let attempt = policy.attempt_count();
                        metrics::record_reconnect();
                        tracing::info!(
                            attempt,
                            delay_ms = delay.as_millis(),
                            "Reconnecting to chart stream"
                        );
                        let _ = self
                            .event_tx
                            .send(StreamEvent::Reconnecting { attempt })
                            .await;

                        tokio::select! {
                            () = self.cancel.cancelled() => return Ok(()),
                            () = tokio::time::sleep(delay) => {}
                        }
                    } else {
                        let _ = self
                            .event_tx
                            .send(StreamEvent::Failed(e.to_string()))
                            .await;
                        return Err(StreamClientError::RetriesExhausted);
                    }
                }
            }
        }
    }

    /// Connect and pump frames until the stream ends one way or another.
    async fn connect_and_stream(
        &self,
        policy: &mut RetryPolicy,
    ) -> Result<ConnectionEnd, StreamClientError> {
        let endpoint = self.config.endpoint();
        tracing::info!(url = %endpoint, "Connecting to chart stream");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(&endpoint).await?;
        policy.reset();
        let _ = self.event_tx.send(StreamEvent::Connected).await;

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    return Ok(ConnectionEnd::Cancelled);
                }
                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if self.handle_frame(&text).await {
                                return Ok(ConnectionEnd::StreamComplete);
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Server sent close frame");
                            return Err(StreamClientError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {
                            // Binary and pong frames are not part of the protocol.
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            tracing::info!("WebSocket stream ended");
                            return Err(StreamClientError::ConnectionClosed);
                        }
                    }
                }
            }
        }
    }

    /// Decode and forward one text frame.
    ///
    /// Returns `true` when the frame was the stream's `close` event.
    /// Malformed frames are dropped here so a single corrupt message never
    /// terminates the session.
    async fn handle_frame(&self, text: &str) -> bool {
        match self.codec.decode(text) {
            Ok(message) => {
                let complete = matches!(message, ChartMessage::Close);
                let _ = self.event_tx.send(StreamEvent::Message(message)).await;
                complete
            }
            Err(e) => {
                metrics::record_malformed_payload();
                tracing::warn!(error = %e, "Dropping malformed stream frame");
                false
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
