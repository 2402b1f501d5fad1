//! Typed observer for trading events.

use std::time::Duration;

use tracing::{debug, warn};
use wirefeed_transport::{ClientEvent, CloseReason, Envelope};

use crate::messages::{
    MarketData, Order, OrderBook, PositionUpdate, ServerError, SubscriptionAck, Trade,
    TradingEvent,
};

/// Receives decoded trading events.
///
/// Every method defaults to a no-op; implement the ones you care about.
/// Methods run on the dispatch task and should not block.
#[allow(unused_variables)]
pub trait TradingHandler: Send + Sync + 'static {
    fn on_connected(&self) {}

    fn on_disconnected(&self, reason: &CloseReason) {}

    fn on_reconnecting(&self, attempt: u32, max_attempts: u32, delay: Duration) {}

    fn on_reconnect_exhausted(&self, attempts: u32) {}

    /// Informational transport fault; recovery is automatic.
    fn on_transport_error(&self, message: &str) {}

    fn on_market_data(&self, data: MarketData) {}

    fn on_trade(&self, trade: Trade) {}

    fn on_orderbook(&self, book: OrderBook) {}

    fn on_position_update(&self, position: PositionUpdate) {}

    fn on_order_update(&self, order: Order) {}

    fn on_subscription_ack(&self, ack: SubscriptionAck) {}

    /// Uncorrelated `error` envelope pushed by the server.
    fn on_server_error(&self, error: ServerError) {}

    /// Envelope of a type outside the trading protocol.
    fn on_unknown(&self, envelope: Envelope) {}
}

/// Route one client event to `handler`.
///
/// Payloads that fail to decode are logged and dropped.
pub fn dispatch<H: TradingHandler + ?Sized>(handler: &H, event: ClientEvent) {
    match event {
        ClientEvent::Connected => handler.on_connected(),
        ClientEvent::Disconnected { reason } => handler.on_disconnected(&reason),
        ClientEvent::Error { message } => handler.on_transport_error(&message),
        ClientEvent::Reconnecting {
            attempt,
            max_attempts,
            delay,
        } => handler.on_reconnecting(attempt, max_attempts, delay),
        ClientEvent::ReconnectExhausted { attempts } => handler.on_reconnect_exhausted(attempts),
        ClientEvent::Message(envelope) => dispatch_envelope(handler, envelope),
    }
}

fn dispatch_envelope<H: TradingHandler + ?Sized>(handler: &H, envelope: Envelope) {
    let kind = envelope.kind.clone();
    let event = match TradingEvent::from_envelope(envelope) {
        Ok(event) => event,
        Err(e) => {
            warn!(kind = %kind, error = %e, "Dropping undecodable trading payload");
            return;
        }
    };

    match event {
        TradingEvent::MarketData(data) => handler.on_market_data(data),
        TradingEvent::Trade(trade) => handler.on_trade(trade),
        TradingEvent::OrderBook(book) => handler.on_orderbook(book),
        TradingEvent::PositionUpdate(position) => handler.on_position_update(position),
        TradingEvent::OrderUpdate(order) => handler.on_order_update(order),
        TradingEvent::SubscriptionAck(ack) => handler.on_subscription_ack(ack),
        TradingEvent::ServerError(error) => {
            warn!(message = %error.message, "Server error");
            handler.on_server_error(error);
        }
        TradingEvent::Unknown(envelope) => {
            debug!(kind = %envelope.kind, "Unhandled message type");
            handler.on_unknown(envelope);
        }
    }
}
