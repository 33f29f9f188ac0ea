//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port boundaries
//! described in the application layer.

/// Stream transport adapters (wire messages, codec, WebSocket client).
pub mod stream;

/// Render command distribution hub.
pub mod render;

/// Theme color-token provider.
pub mod theme;

/// Configuration and dependency injection.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// OpenTelemetry tracing integration.
pub mod telemetry;
