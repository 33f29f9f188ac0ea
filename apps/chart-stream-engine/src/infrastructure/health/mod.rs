//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, session status reporting, and
//! Prometheus metrics. Used by container orchestrators, load balancers,
//! and monitoring systems.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (checks the session)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::session::{SessionState, SessionStatus};
use crate::infrastructure::metrics::get_metrics_handle;
use crate::infrastructure::render::SharedRenderHub;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Engine version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Stream session status.
    pub session: SessionInfo,
    /// Render distribution status.
    pub render: RenderInfo,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The session is active and ingesting.
    Healthy,
    /// The session is still connecting.
    Degraded,
    /// The session is closed.
    Unhealthy,
}

/// Stream session status details.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    /// Session id.
    pub id: String,
    /// Lifecycle state.
    pub state: SessionState,
    /// Snapshots accepted into the aggregator.
    pub snapshots_received: u64,
    /// Snapshots dropped for unknown entities.
    pub snapshots_dropped: u64,
    /// Render flushes performed.
    pub flushes: u64,
    /// Time of the most recent flush.
    pub last_flush: Option<DateTime<Utc>>,
}

/// Render distribution details.
#[derive(Debug, Clone, Serialize)]
pub struct RenderInfo {
    /// Active render command consumers.
    pub consumers: usize,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    session: Arc<SessionStatus>,
    render_hub: SharedRenderHub,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(version: String, session: Arc<SessionStatus>, render_hub: SharedRenderHub) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            session,
            render_hub,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let app = Router::new()
            .route("/health", get(health_handler))
            .route("/healthz", get(liveness_handler))
            .route("/readyz", get(readiness_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Health server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.session.state() == SessionState::Active {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let session_state = state.session.state();

    HealthResponse {
        status: health_status_for(session_state),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        session: SessionInfo {
            id: state.session.session_id().to_string(),
            state: session_state,
            snapshots_received: state.session.snapshots_received(),
            snapshots_dropped: state.session.snapshots_dropped(),
            flushes: state.session.flush_count(),
            last_flush: state.session.last_flush(),
        },
        render: RenderInfo {
            consumers: state.render_hub.receiver_count(),
        },
    }
}

const fn health_status_for(state: SessionState) -> HealthStatus {
    match state {
        SessionState::Active => HealthStatus::Healthy,
        SessionState::Connecting => HealthStatus::Degraded,
        SessionState::Closed => HealthStatus::Unhealthy,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::render::RenderHub;

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }

    #[test]
    fn status_follows_session_state() {
        assert_eq!(
            health_status_for(SessionState::Active),
            HealthStatus::Healthy
        );
        assert_eq!(
            health_status_for(SessionState::Connecting),
            HealthStatus::Degraded
        );
        assert_eq!(
            health_status_for(SessionState::Closed),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn response_reflects_session_counters() {
        let session = Arc::new(SessionStatus::new());
        session.record_snapshot();
        session.record_snapshot();
        session.record_dropped();
        session.record_flush();

        let hub = Arc::new(RenderHub::with_defaults());
        let state = HealthServerState::new("test-0.0.1".to_string(), session, hub);

        let response = build_health_response(&state);
        assert_eq!(response.session.snapshots_received, 2);
        assert_eq!(response.session.snapshots_dropped, 1);
        assert_eq!(response.session.flushes, 1);
        assert!(response.session.last_flush.is_some());
        assert_eq!(response.status, HealthStatus::Degraded);
    }
}
