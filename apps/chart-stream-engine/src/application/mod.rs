//! Application Layer - Session orchestration and port definitions.
//!
//! This layer contains the stream session service that drives the domain
//! aggregation from transport events, and the port boundaries it talks
//! through.

/// Port boundaries for external systems (stream source, renderer, theme).
pub mod ports;

/// Stream session state machine and batch scheduling.
pub mod session;
