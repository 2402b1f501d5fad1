//! Resilient WebSocket channel.
//!
//! This module keeps one logical duplex channel to one endpoint alive over an
//! unreliable link:
//!
//! - **Connection state machine**: `Connecting -> Open -> Closing -> Closed`,
//!   with idempotent `connect`
//! - **Bounded reconnection**: fixed interval, limited attempts, one armed timer
//! - **Heartbeats**: a `heartbeat` envelope every interval while open
//! - **Outbound queue**: sends while closed are queued and flushed FIFO on open
//! - **Subscriptions**: tracked topics are replayed once on every open
//! - **Request/response**: correlated requests resolved or rejected exactly once
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  Command   ┌─────────────────┐  Link   ┌──────────────┐
//! │  WsClient   │──────────▶│ ConnectionActor │◀──────▶│   Endpoint   │
//! │  (Clone)    │            │   (Background)  │         │              │
//! └──────┬──────┘            └───────┬─────────┘         └──────────────┘
//!        │         ClientEvent       │
//!        │   ◀── EventStream ◀───────┤
//!        │                           │
//!        ▼                           ▼
//! ┌─────────────────────┐   ┌────────────────────────┐
//! │ PendingRequestStore │   │  SubscriptionRegistry  │
//! │   (scc::HashMap)    │   │    (scc::HashMap)      │
//! └─────────────────────┘   └────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//!
//! use wirefeed_transport::websocket::{ClientEvent, Envelope, WsClient, WsConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WsConfig::new("ws://feed.example.com/ws")
//!         .heartbeat_interval(Duration::from_secs(15));
//!     let (client, mut events) = WsClient::with_tungstenite(config)?;
//!
//!     client.connect().await?;
//!     client.subscribe("market_data.BTCUSDT", Default::default()).await?;
//!
//!     let reply = client
//!         .send_with_response(
//!             Envelope::new("create_order", serde_json::json!({"symbol": "BTCUSDT"})),
//!             "order_created",
//!             None,
//!         )
//!         .await?;
//!     println!("created: {reply}");
//!
//!     while let Some(event) = events.next().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `reconnect_interval` | 5s | Delay before each reconnect attempt |
//! | `max_reconnect_attempts` | 10 | Attempts before `ReconnectExhausted` |
//! | `enable_heartbeat` | true | Send heartbeat envelopes while open |
//! | `heartbeat_interval` | 30s | Interval between heartbeats |
//! | `request_timeout` | 10s | Default request-response timeout |
//! | `connect_timeout` | 10s | Limit on a single connection attempt |
//! | `max_pending_requests` | 1000 | Maximum concurrent pending requests |
//! | `fail_pending_on_close` | false | Reject pending requests on close |
//!
//! # Error Handling
//!
//! Link failures never reach callers as errors; they show up as
//! [`ClientEvent::Error`] and [`ClientEvent::Disconnected`] and are recovered by
//! reconnection. Request failures are returned only to the request's caller:
//!
//! - [`TransportError::RequestTimeout`](crate::error::TransportError::RequestTimeout) - no reply in time
//! - [`TransportError::UnexpectedResponseType`](crate::error::TransportError::UnexpectedResponseType) - reply of the wrong type
//! - [`TransportError::Remote`](crate::error::TransportError::Remote) - `error` reply
//! - [`TransportError::CapacityExceeded`](crate::error::TransportError::CapacityExceeded) - too many pending requests

mod actor;
mod client;
mod config;
mod envelope;
mod events;
mod link;
mod pending;
mod queue;
mod subscription;
mod types;

pub use client::WsClient;
pub use config::WsConfig;
pub use envelope::{Envelope, kinds, millis};
pub use events::{ClientEvent, CloseReason, EventStream};
#[cfg(feature = "tungstenite")]
pub use link::TungsteniteConnector;
pub use link::{Connector, Link};
pub use pending::{PendingRequestStore, ResponseReceiver};
pub use subscription::SubscriptionRegistry;
pub use types::{ConnectionState, CorrelationId, SubscriptionParams, Topic};
