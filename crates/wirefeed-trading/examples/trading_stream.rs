//! Trading Stream Example
//!
//! Subscribes to ticker, trade and book streams for one symbol and logs every
//! typed event.
//!
//! Run with: `cargo run -p wirefeed-trading --example trading_stream -- ws://127.0.0.1:9001/ws BTCUSDT`

use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wirefeed_trading::{
    MarketData, Order, OrderBook, PositionUpdate, ServerError, Trade, TradingClient,
    TradingHandler,
};
use wirefeed_transport::{CloseReason, Envelope, WsConfig};

struct LoggingHandler;

impl TradingHandler for LoggingHandler {
    fn on_connected(&self) {
        info!("Connected");
    }

    fn on_disconnected(&self, reason: &CloseReason) {
        warn!(?reason, "Disconnected");
    }

    fn on_reconnecting(&self, attempt: u32, max_attempts: u32, delay: Duration) {
        info!(attempt, max_attempts, ?delay, "Reconnecting");
    }

    fn on_reconnect_exhausted(&self, attempts: u32) {
        warn!(attempts, "Reconnection gave up");
    }

    fn on_market_data(&self, data: MarketData) {
        info!(symbol = %data.symbol, price = %data.price, bid = ?data.bid, ask = ?data.ask, "Ticker");
    }

    fn on_trade(&self, trade: Trade) {
        info!(symbol = %trade.symbol, price = %trade.price, quantity = %trade.quantity, side = ?trade.side, "Trade");
    }

    fn on_orderbook(&self, book: OrderBook) {
        info!(
            symbol = %book.symbol,
            kind = ?book.update_type,
            best_bid = ?book.best_bid().map(|level| level.price),
            best_ask = ?book.best_ask().map(|level| level.price),
            "Book"
        );
    }

    fn on_position_update(&self, position: PositionUpdate) {
        info!(symbol = %position.symbol, size = %position.size, "Position");
    }

    fn on_order_update(&self, order: Order) {
        info!(order_id = %order.order_id, status = ?order.status, filled = %order.filled_quantity, "Order");
    }

    fn on_server_error(&self, error: ServerError) {
        warn!(message = %error.message, code = ?error.code, "Server error");
    }

    fn on_unknown(&self, envelope: Envelope) {
        info!(kind = %envelope.kind, "Unhandled message");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| "ws://127.0.0.1:9001/ws".to_string());
    let symbol = args.next().unwrap_or_else(|| "BTCUSDT".to_string());

    let client = TradingClient::with_tungstenite(WsConfig::new(url), LoggingHandler)?;
    client.connect().await?;

    client.subscribe_market_data(&symbol).await?;
    client.subscribe_trades(&symbol).await?;
    client.subscribe_orderbook(&symbol, Some(10)).await?;

    tokio::signal::ctrl_c().await?;

    client.disconnect().await?;
    info!(metrics = ?client.transport().metrics(), "Done");
    Ok(())
}
