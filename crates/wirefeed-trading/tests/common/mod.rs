#![allow(dead_code)]

use std::time::Duration;

use async_trait::async_trait;
use futures::{
    SinkExt, StreamExt,
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use tokio::sync::mpsc as tokio_mpsc;
use wirefeed_trading::{
    MarketData, Order, OrderBook, PositionUpdate, ServerError, SubscriptionAck, Trade,
    TradingClient, TradingHandler,
};
use wirefeed_transport::{
    CloseReason, Connector, Envelope, Link, TransportError, TransportResult, WsConfig,
};

pub const WAIT: Duration = Duration::from_secs(60);

/// Hands the server half of every link to the test.
#[derive(Clone)]
pub struct MockConnector {
    sessions: UnboundedSender<ServerSide>,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &str) -> TransportResult<Link> {
        let (to_server, from_client) = mpsc::unbounded::<String>();
        let (to_client, from_server) = mpsc::unbounded::<TransportResult<String>>();
        let _ = self.sessions.unbounded_send(ServerSide {
            from_client,
            to_client,
        });

        Ok(Link::new(
            to_server.sink_map_err(|e| TransportError::websocket(e.to_string())),
            from_server,
        ))
    }
}

pub struct ServerSide {
    from_client: UnboundedReceiver<String>,
    to_client: UnboundedSender<TransportResult<String>>,
}

impl ServerSide {
    pub async fn recv(&mut self) -> Envelope {
        let text = tokio::time::timeout(WAIT, self.from_client.next())
            .await
            .expect("timed out waiting for client frame")
            .expect("client closed the link");
        Envelope::decode(&text).expect("client sent malformed envelope")
    }

    pub fn push(&self, kind: &str, data: serde_json::Value) {
        self.push_raw(Envelope::new(kind, data).encode().expect("encode"));
    }

    pub fn push_raw(&self, text: impl Into<String>) {
        let _ = self.to_client.unbounded_send(Ok(text.into()));
    }

    pub fn reply(&self, request: &Envelope, kind: &str, data: serde_json::Value) {
        let mut reply = Envelope::new(kind, data);
        reply.correlation_id = request.correlation_id.clone();
        self.push_raw(reply.encode().expect("encode"));
    }
}

/// What the handler saw, in arrival order.
#[derive(Debug)]
pub enum Seen {
    Connected,
    Disconnected(CloseReason),
    TransportError(String),
    MarketData(MarketData),
    Trade(Trade),
    OrderBook(OrderBook),
    Position(PositionUpdate),
    Order(Order),
    Ack(SubscriptionAck),
    ServerError(ServerError),
    Unknown(String),
}

pub struct Recorder {
    tx: tokio_mpsc::UnboundedSender<Seen>,
}

impl Recorder {
    fn see(&self, seen: Seen) {
        let _ = self.tx.send(seen);
    }
}

impl TradingHandler for Recorder {
    fn on_connected(&self) {
        self.see(Seen::Connected);
    }

    fn on_disconnected(&self, reason: &CloseReason) {
        self.see(Seen::Disconnected(reason.clone()));
    }

    fn on_transport_error(&self, message: &str) {
        self.see(Seen::TransportError(message.to_string()));
    }

    fn on_market_data(&self, data: MarketData) {
        self.see(Seen::MarketData(data));
    }

    fn on_trade(&self, trade: Trade) {
        self.see(Seen::Trade(trade));
    }

    fn on_orderbook(&self, book: OrderBook) {
        self.see(Seen::OrderBook(book));
    }

    fn on_position_update(&self, position: PositionUpdate) {
        self.see(Seen::Position(position));
    }

    fn on_order_update(&self, order: Order) {
        self.see(Seen::Order(order));
    }

    fn on_subscription_ack(&self, ack: SubscriptionAck) {
        self.see(Seen::Ack(ack));
    }

    fn on_server_error(&self, error: ServerError) {
        self.see(Seen::ServerError(error));
    }

    fn on_unknown(&self, envelope: Envelope) {
        self.see(Seen::Unknown(envelope.kind));
    }
}

pub struct Harness {
    pub client: TradingClient,
    pub seen: tokio_mpsc::UnboundedReceiver<Seen>,
    pub sessions: UnboundedReceiver<ServerSide>,
}

impl Harness {
    pub fn new() -> Self {
        let (sessions_tx, sessions) = mpsc::unbounded();
        let (tx, seen) = tokio_mpsc::unbounded_channel();
        let config = WsConfig::new("ws://mock.invalid/ws").enable_heartbeat(false);
        let client = TradingClient::new(
            config,
            MockConnector {
                sessions: sessions_tx,
            },
            Recorder { tx },
        )
        .expect("client construction");
        Self {
            client,
            seen,
            sessions,
        }
    }

    pub async fn next_seen(&mut self) -> Seen {
        tokio::time::timeout(WAIT, self.seen.recv())
            .await
            .expect("timed out waiting for handler call")
            .expect("dispatch task ended")
    }

    /// Connect and wait until the handler saw `on_connected`.
    pub async fn open(&mut self) -> ServerSide {
        self.client.connect().await.expect("connect");
        let server = tokio::time::timeout(WAIT, self.sessions.next())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped");
        match self.next_seen().await {
            Seen::Connected => {}
            other => panic!("expected Connected, got {other:?}"),
        }
        server
    }
}
