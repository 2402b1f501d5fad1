//! # Wirefeed Trading
//!
//! Trading streams and order commands on top of [`wirefeed_transport`].
//!
//! Inbound envelopes are decoded into [`TradingEvent`]s and routed to a
//! [`TradingHandler`]. Order commands are correlated requests that resolve with
//! the venue's reply or fail with a [`TradingError`].
//!
//! ```rust,no_run
//! use rust_decimal::Decimal;
//! use wirefeed_trading::{CreateOrder, MarketData, Side, TradingClient, TradingHandler};
//! use wirefeed_transport::WsConfig;
//!
//! struct Printer;
//!
//! impl TradingHandler for Printer {
//!     fn on_market_data(&self, data: MarketData) {
//!         println!("{} {}", data.symbol, data.price);
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TradingClient::with_tungstenite(WsConfig::new("ws://127.0.0.1:9001/ws"), Printer)?;
//! client.connect().await?;
//! client.subscribe_market_data("BTCUSDT").await?;
//!
//! let order = CreateOrder::limit("BTCUSDT", Side::Buy, Decimal::ONE, Decimal::new(64_000, 0));
//! let placed = client.create_order(&order).await?;
//! println!("placed {}", placed.order_id);
//! # Ok(())
//! # }
//! ```

mod client;
pub mod error;
pub mod handler;
pub mod messages;

pub use client::TradingClient;
pub use error::{TradingError, TradingResult};
pub use handler::{TradingHandler, dispatch};
pub use messages::{
    BookUpdateType, CancelAck, CancelOrder, CreateOrder, MarketData, ModifyOrder, Order,
    OrderBook, OrderStatus, OrderType, PositionUpdate, PriceLevel, ServerError, Side,
    SubscriptionAck, Trade, TradingEvent,
};
