//! Stream Transport Adapters
//!
//! Connects to the balance projection event stream and turns wire frames
//! into typed chart messages:
//!
//! - `messages`: wire payload types and the decoded [`ChartMessage`] model.
//! - `codec`: JSON envelope decoding with the malformed-payload policy.
//! - `backoff`: retry policy for transparent reconnection.
//! - `client`: WebSocket client delivering [`StreamEvent`]s to the session.

pub mod backoff;
pub mod client;
pub mod codec;
pub mod messages;

pub use backoff::{RetryConfig, RetryPolicy};
pub use client::{ChartStreamClient, ChartStreamConfig, StreamClientError, StreamEvent};
pub use codec::{CodecError, JsonCodec};
pub use messages::{ChartMessage, EntitySetup, SetupEvent};
