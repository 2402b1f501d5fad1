//! # Wirefeed Transport
//!
//! A resilient real-time messaging channel over WebSocket.
//!
//! The crate keeps a single logical duplex channel to one remote endpoint and
//! moves typed JSON envelopes across it reliably, in order and recoverably.
//!
//! ## Features
//!
//! - **Connection management**: explicit state machine with bounded, fixed-interval reconnection
//! - **Liveness**: periodic heartbeat envelopes while open
//! - **Delivery**: outbound queue while disconnected, flushed in order on reconnect
//! - **Subscriptions**: tracked topics replayed exactly once per reconnect
//! - **Request/response**: correlation ids with per-request deadlines
//! - **Observability**: `tracing` logs and counters, optional OTLP export (`otel` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wirefeed_transport::{ClientEvent, WsClient, WsConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (client, mut events) = WsClient::with_tungstenite(WsConfig::new("ws://feed.example.com/ws"))?;
//!     client.connect().await?;
//!
//!     while let Some(event) = events.next().await {
//!         if let ClientEvent::Message(envelope) = event {
//!             println!("{}: {}", envelope.kind, envelope.data);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod metrics;
mod reconnect;
pub mod websocket;

pub use error::{TransportError, TransportResult};
pub use metrics::{ConnectionMetrics, MetricsSnapshot};
#[cfg(feature = "tungstenite")]
pub use websocket::TungsteniteConnector;
pub use websocket::{
    ClientEvent, CloseReason, ConnectionState, Connector, CorrelationId, Envelope, EventStream,
    Link, SubscriptionParams, Topic, WsClient, WsConfig,
};
