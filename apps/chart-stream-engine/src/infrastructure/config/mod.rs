//! Configuration and dependency injection.
//!
//! Engine configuration is loaded from environment variables with typed
//! defaults; see [`settings::EngineConfig::from_env`].

pub mod settings;

pub use settings::{
    BatchSettings, ConfigError, EngineConfig, RenderSettings, ServerSettings, TransportSettings,
};
