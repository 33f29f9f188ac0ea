//! Port Boundaries
//!
//! The session talks to the outside world through three boundaries,
//! following the Hexagonal Architecture pattern:
//!
//! ## Driver Ports (Inbound)
//!
//! - **Stream source**: decoded [`StreamEvent`]s delivered over an mpsc
//!   channel by the transport adapter
//!   (`infrastructure::stream::ChartStreamClient`).
//! - **Selection notifications**: renderer-originated
//!   [`SelectionChanged`] notifications over an mpsc channel.
//!
//! ## Driven Ports (Outbound)
//!
//! - **Render sink**: [`RenderCommand`]s broadcast through the
//!   `infrastructure::render::RenderHub`.
//! - **Theme source**: the `infrastructure::theme::ThemeSource` trait,
//!   resolved once at session construction.
//!
//! [`StreamEvent`]: crate::infrastructure::stream::StreamEvent
//! [`SelectionChanged`]: crate::infrastructure::render::SelectionChanged
//! [`RenderCommand`]: crate::infrastructure::render::RenderCommand
