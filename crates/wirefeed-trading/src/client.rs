use std::{sync::Arc, time::Duration};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;
use wirefeed_transport::{
    Connector, ConnectionState, Envelope, EventStream, SubscriptionParams, TransportResult,
    WsClient, WsConfig,
};

use crate::{
    error::TradingResult,
    handler::{TradingHandler, dispatch},
    messages::{CancelAck, CancelOrder, CreateOrder, ModifyOrder, Order, kinds},
};

const SOURCE: &str = "wirefeed-trading";

/// Trading client over one [`WsClient`].
///
/// Inbound events are decoded and routed to the handler on a dedicated task;
/// order commands are correlated requests.
#[derive(Clone)]
pub struct TradingClient {
    ws: WsClient,
    request_timeout: Duration,
}

impl std::fmt::Debug for TradingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingClient")
            .field("url", &self.ws.config().url)
            .field("state", &self.ws.state())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl TradingClient {
    /// Build the client and start routing its events to `handler`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<C, H>(config: WsConfig, connector: C, handler: H) -> TransportResult<Self>
    where
        C: Connector,
        H: TradingHandler,
    {
        let (ws, events) = WsClient::new(config, connector)?;
        Ok(Self::from_parts(ws, events, Arc::new(handler)))
    }

    #[cfg(feature = "tungstenite")]
    pub fn with_tungstenite<H: TradingHandler>(config: WsConfig, handler: H) -> TransportResult<Self> {
        let (ws, events) = WsClient::with_tungstenite(config)?;
        Ok(Self::from_parts(ws, events, Arc::new(handler)))
    }

    /// Wrap an existing client and its event stream.
    pub fn from_parts(ws: WsClient, mut events: EventStream, handler: Arc<dyn TradingHandler>) -> Self {
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                dispatch(handler.as_ref(), event);
            }
            debug!("Trading event stream ended");
        });

        let request_timeout = ws.config().request_timeout;
        Self {
            ws,
            request_timeout,
        }
    }

    /// Override the deadline applied to order commands.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The underlying transport client.
    pub fn transport(&self) -> &WsClient {
        &self.ws
    }

    pub fn state(&self) -> ConnectionState {
        self.ws.state()
    }

    pub async fn connect(&self) -> TransportResult<()> {
        self.ws.connect().await
    }

    pub async fn disconnect(&self) -> TransportResult<()> {
        self.ws.disconnect().await
    }

    // ---- subscriptions ----

    /// Ticker updates for `symbol`; topic `market_data.<symbol>`.
    pub async fn subscribe_market_data(&self, symbol: &str) -> TransportResult<()> {
        self.subscribe_channel("market_data", Some(symbol), None).await
    }

    /// Executed trades for `symbol`; topic `trades.<symbol>`.
    pub async fn subscribe_trades(&self, symbol: &str) -> TransportResult<()> {
        self.subscribe_channel("trades", Some(symbol), None).await
    }

    /// Book updates for `symbol`; topic `orderbook.<symbol>`.
    pub async fn subscribe_orderbook(&self, symbol: &str, depth: Option<u32>) -> TransportResult<()> {
        self.subscribe_channel("orderbook", Some(symbol), depth).await
    }

    pub async fn subscribe_positions(&self) -> TransportResult<()> {
        self.subscribe_channel("positions", None, None).await
    }

    pub async fn subscribe_orders(&self) -> TransportResult<()> {
        self.subscribe_channel("orders", None, None).await
    }

    pub async fn unsubscribe(&self, topic: &str) -> TransportResult<()> {
        self.ws.unsubscribe(topic).await
    }

    async fn subscribe_channel(
        &self,
        channel: &str,
        symbol: Option<&str>,
        depth: Option<u32>,
    ) -> TransportResult<()> {
        let mut params = SubscriptionParams::new();
        params.insert("channel".to_string(), Value::from(channel));
        let topic = match symbol {
            Some(symbol) => {
                params.insert("symbol".to_string(), Value::from(symbol));
                format!("{channel}.{symbol}")
            }
            None => channel.to_string(),
        };
        if let Some(depth) = depth {
            params.insert("depth".to_string(), Value::from(depth));
        }
        self.ws.subscribe(&topic, params).await
    }

    // ---- commands ----

    /// Submit an order; resolves with the venue's view of it.
    pub async fn create_order(&self, order: &CreateOrder) -> TradingResult<Order> {
        self.command(kinds::CREATE_ORDER, order, kinds::ORDER_CREATED)
            .await
    }

    pub async fn cancel_order(&self, cancel: &CancelOrder) -> TradingResult<CancelAck> {
        self.command(kinds::CANCEL_ORDER, cancel, kinds::ORDER_CANCELED)
            .await
    }

    pub async fn modify_order(&self, modify: &ModifyOrder) -> TradingResult<Order> {
        self.command(kinds::MODIFY_ORDER, modify, kinds::ORDER_MODIFIED)
            .await
    }

    async fn command<Req, Resp>(&self, kind: &str, payload: &Req, expected: &str) -> TradingResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let envelope = Envelope::new(kind, serde_json::to_value(payload)?).with_source(SOURCE);
        let data = self
            .ws
            .send_with_response(envelope, expected, Some(self.request_timeout))
            .await?;
        Ok(serde_json::from_value(data)?)
    }
}
