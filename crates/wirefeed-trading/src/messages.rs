//! Trading payloads carried in envelope `data`.
//!
//! Prices and quantities are [`Decimal`]; they are accepted as JSON numbers or
//! strings.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use wirefeed_transport::{
    Envelope,
    websocket::{kinds as control, millis},
};

/// Envelope types of the trading protocol.
pub mod kinds {
    pub const MARKET_DATA: &str = "market_data";
    pub const TRADE: &str = "trade";
    pub const ORDERBOOK: &str = "orderbook";
    pub const POSITION_UPDATE: &str = "position_update";
    pub const ORDER_UPDATE: &str = "order_update";

    pub const CREATE_ORDER: &str = "create_order";
    pub const ORDER_CREATED: &str = "order_created";
    pub const CANCEL_ORDER: &str = "cancel_order";
    pub const ORDER_CANCELED: &str = "order_canceled";
    pub const MODIFY_ORDER: &str = "modify_order";
    pub const ORDER_MODIFIED: &str = "order_modified";
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Canceled | Self::Rejected | Self::Expired
        )
    }
}

/// Top-of-book ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketData {
    pub symbol: String,
    pub price: Decimal,
    #[serde(default)]
    pub bid: Option<Decimal>,
    #[serde(default)]
    pub ask: Option<Decimal>,
    #[serde(default)]
    pub volume: Option<Decimal>,
    #[serde(default, deserialize_with = "millis::deserialize")]
    pub timestamp: i64,
}

/// An executed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub symbol: String,
    #[serde(default)]
    pub trade_id: Option<String>,
    pub price: Decimal,
    pub quantity: Decimal,
    pub side: Side,
    #[serde(default, deserialize_with = "millis::deserialize")]
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookUpdateType {
    /// Replaces the whole book.
    #[default]
    Snapshot,
    /// Changes individual levels; a zero quantity removes the level.
    Delta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Order book snapshot or delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBook {
    pub symbol: String,
    #[serde(rename = "type", default)]
    pub update_type: BookUpdateType,
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
    #[serde(default)]
    pub sequence: Option<u64>,
    #[serde(default, deserialize_with = "millis::deserialize")]
    pub timestamp: i64,
}

impl OrderBook {
    pub fn is_snapshot(&self) -> bool {
        self.update_type == BookUpdateType::Snapshot
    }

    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.iter().max_by_key(|level| level.price)
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.iter().min_by_key(|level| level.price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub symbol: String,
    /// Signed size; negative is short.
    pub size: Decimal,
    pub entry_price: Decimal,
    #[serde(default)]
    pub mark_price: Option<Decimal>,
    #[serde(default)]
    pub unrealized_pnl: Option<Decimal>,
    #[serde(default, deserialize_with = "millis::deserialize")]
    pub timestamp: i64,
}

/// Venue view of an order; carried by `order_update`, `order_created` and
/// `order_modified`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    #[serde(default)]
    pub client_order_id: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub filled_quantity: Decimal,
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "millis::deserialize")]
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionAck {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Server-pushed `error`.
///
/// `data` may be a bare string or an object with `message` and optional
/// `code`; any other shape is kept as its JSON text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
}

impl<'de> Deserialize<'de> for ServerError {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = Value::deserialize(deserializer)?;
        let error = match &data {
            Value::String(message) => Self {
                message: message.clone(),
                code: None,
            },
            Value::Object(fields) => Self {
                message: fields
                    .get("message")
                    .and_then(Value::as_str)
                    .map_or_else(|| data.to_string(), str::to_string),
                code: fields.get("code").filter(|code| !code.is_null()).cloned(),
            },
            other => Self {
                message: other.to_string(),
                code: None,
            },
        };
        Ok(error)
    }
}

/// Order submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}

impl CreateOrder {
    pub fn limit(symbol: impl Into<String>, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            client_order_id: None,
        }
    }

    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            client_order_id: None,
        }
    }

    #[must_use]
    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrder {
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

/// Price and/or quantity amendment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyOrder {
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
}

/// Reply to `cancel_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAck {
    pub order_id: String,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// Inbound trading message decoded by envelope type.
#[derive(Debug, Clone, PartialEq)]
pub enum TradingEvent {
    MarketData(MarketData),
    Trade(Trade),
    OrderBook(OrderBook),
    PositionUpdate(PositionUpdate),
    OrderUpdate(Order),
    SubscriptionAck(SubscriptionAck),
    ServerError(ServerError),
    /// Any type outside the trading protocol.
    Unknown(Envelope),
}

impl TradingEvent {
    /// Decode `envelope` by its `type`.
    ///
    /// Fails only when a known type carries a payload of the wrong shape.
    pub fn from_envelope(envelope: Envelope) -> Result<Self, serde_json::Error> {
        let data = &envelope.data;
        let event = match envelope.kind.as_str() {
            kinds::MARKET_DATA => Self::MarketData(MarketData::deserialize(data)?),
            kinds::TRADE => Self::Trade(Trade::deserialize(data)?),
            kinds::ORDERBOOK => Self::OrderBook(OrderBook::deserialize(data)?),
            kinds::POSITION_UPDATE => Self::PositionUpdate(PositionUpdate::deserialize(data)?),
            kinds::ORDER_UPDATE => Self::OrderUpdate(Order::deserialize(data)?),
            control::SUBSCRIPTION_ACK => Self::SubscriptionAck(SubscriptionAck::deserialize(data)?),
            control::ERROR => Self::ServerError(ServerError::deserialize(data)?),
            _ => Self::Unknown(envelope),
        };
        Ok(event)
    }
}
