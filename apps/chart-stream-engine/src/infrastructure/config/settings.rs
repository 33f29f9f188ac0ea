//! Engine Configuration Settings
//!
//! Configuration types for the chart stream engine, loaded from environment
//! variables. Every setting has a default; only the stream endpoint is
//! commonly overridden.

use std::time::Duration;

/// Batch scheduling settings.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Interval between coalesced render flushes.
    pub interval: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
        }
    }
}

/// Stream transport settings.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// WebSocket endpoint of the chart stream.
    pub stream_url: String,
    /// Query filter forwarded to the endpoint, without the leading `?`.
    pub stream_query: Option<String>,
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
    /// Capacity of the stream event channel.
    pub events_capacity: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            stream_url: "ws://localhost:8080/chart/stream".to_string(),
            stream_query: None,
            reconnect_delay_initial: Duration::from_millis(500),
            reconnect_delay_max: Duration::from_secs(30),
            reconnect_delay_multiplier: 2.0,
            max_reconnect_attempts: 0, // Unlimited
            events_capacity: 1_024,
        }
    }
}

/// Render distribution settings.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Capacity of the render command channel.
    pub commands_capacity: usize,
    /// Capacity of the selection notification channel.
    pub selections_capacity: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            commands_capacity: 1_024,
            selections_capacity: 64,
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Health check HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Batch scheduling settings.
    pub batch: BatchSettings,
    /// Stream transport settings.
    pub transport: TransportSettings,
    /// Render distribution settings.
    pub render: RenderSettings,
    /// Server port settings.
    pub server: ServerSettings,
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `CHART_STREAM_URL` is set but empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let stream_url = match std::env::var("CHART_STREAM_URL") {
            Ok(url) if url.is_empty() => {
                return Err(ConfigError::EmptyValue("CHART_STREAM_URL".to_string()));
            }
            Ok(url) => url,
            Err(_) => TransportSettings::default().stream_url,
        };

        let stream_query = std::env::var("CHART_STREAM_QUERY")
            .ok()
            .filter(|query| !query.is_empty());

        let batch = BatchSettings {
            interval: parse_env_duration_millis(
                "CHART_BATCH_INTERVAL_MS",
                BatchSettings::default().interval,
            ),
        };

        let transport = TransportSettings {
            stream_url,
            stream_query,
            reconnect_delay_initial: parse_env_duration_millis(
                "CHART_RECONNECT_DELAY_INITIAL_MS",
                TransportSettings::default().reconnect_delay_initial,
            ),
            reconnect_delay_max: parse_env_duration_secs(
                "CHART_RECONNECT_DELAY_MAX_SECS",
                TransportSettings::default().reconnect_delay_max,
            ),
            reconnect_delay_multiplier: parse_env_f64(
                "CHART_RECONNECT_DELAY_MULTIPLIER",
                TransportSettings::default().reconnect_delay_multiplier,
            ),
            max_reconnect_attempts: parse_env_u32(
                "CHART_MAX_RECONNECT_ATTEMPTS",
                TransportSettings::default().max_reconnect_attempts,
            ),
            events_capacity: parse_env_usize(
                "CHART_STREAM_EVENTS_CAPACITY",
                TransportSettings::default().events_capacity,
            ),
        };

        let render = RenderSettings {
            commands_capacity: parse_env_usize(
                "CHART_RENDER_COMMANDS_CAPACITY",
                RenderSettings::default().commands_capacity,
            ),
            selections_capacity: parse_env_usize(
                "CHART_SELECTIONS_CAPACITY",
                RenderSettings::default().selections_capacity,
            ),
        };

        let server = ServerSettings {
            health_port: parse_env_u16("CHART_HEALTH_PORT", ServerSettings::default().health_port),
        };

        Ok(Self {
            batch,
            transport,
            render,
            server,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
