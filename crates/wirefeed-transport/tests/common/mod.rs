#![allow(dead_code)]

use std::{
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    task::{Context, Poll},
    time::Duration,
};

use async_trait::async_trait;
use futures::{
    Sink, StreamExt,
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use wirefeed_transport::{
    ClientEvent, Connector, Envelope, EventStream, Link, TransportError, TransportResult,
    WsClient, WsConfig,
};

pub const WAIT: Duration = Duration::from_secs(60);

/// In-memory connector; every successful connect hands the server half of the
/// link to the test through `sessions`.
#[derive(Clone)]
pub struct MockConnector {
    attempts: Arc<AtomicUsize>,
    refuse: Arc<AtomicBool>,
    failing_writes: Arc<AtomicUsize>,
    sessions: UnboundedSender<ServerSide>,
}

impl MockConnector {
    pub fn new() -> (Self, UnboundedReceiver<ServerSide>) {
        let (sessions, rx) = mpsc::unbounded();
        let connector = Self {
            attempts: Arc::new(AtomicUsize::new(0)),
            refuse: Arc::new(AtomicBool::new(false)),
            failing_writes: Arc::new(AtomicUsize::new(0)),
            sessions,
        };
        (connector, rx)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Make the next `count` writes fail on whichever link is open. Reads are
    /// unaffected.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &str) -> TransportResult<Link> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::websocket("connection refused"));
        }

        let (to_server, from_client) = mpsc::unbounded::<String>();
        let (to_client, from_server) = mpsc::unbounded::<TransportResult<String>>();
        let _ = self.sessions.unbounded_send(ServerSide {
            from_client,
            to_client,
        });

        let sink = ClientSink {
            to_server,
            failing_writes: Arc::clone(&self.failing_writes),
        };

        Ok(Link::new(sink, from_server))
    }
}

/// Client half of the write path; fails while `failing_writes` is non-zero.
struct ClientSink {
    to_server: UnboundedSender<String>,
    failing_writes: Arc<AtomicUsize>,
}

impl Sink<String> for ClientSink {
    type Error = TransportError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, text: String) -> Result<(), Self::Error> {
        let refused = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::websocket("write refused"));
        }
        self.to_server
            .unbounded_send(text)
            .map_err(|e| TransportError::websocket(e.to_string()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.to_server.close_channel();
        Poll::Ready(Ok(()))
    }
}

/// The endpoint's half of one link. Dropping it drops the link.
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

    /// Assert nothing arrives within `window`.
    pub async fn assert_silent(&mut self, window: Duration) {
        if let Ok(Some(text)) = tokio::time::timeout(window, self.from_client.next()).await {
            panic!("unexpected client frame: {text}");
        }
    }

    /// Wait for the client to close its half.
    pub async fn closed(&mut self) {
        let end = tokio::time::timeout(WAIT, async {
            while self.from_client.next().await.is_some() {}
        })
        .await;
        assert!(end.is_ok(), "client never closed the link");
    }

    pub fn push(&self, envelope: &Envelope) {
        self.push_raw(envelope.encode().expect("encode"));
    }

    pub fn push_raw(&self, text: impl Into<String>) {
        let _ = self.to_client.unbounded_send(Ok(text.into()));
    }

    pub fn fail(&self, message: &str) {
        let _ = self
            .to_client
            .unbounded_send(Err(TransportError::websocket(message)));
    }

    /// Reply to `request` with an envelope of type `kind`.
    pub fn reply(&self, request: &Envelope, kind: &str, data: serde_json::Value) {
        let mut reply = Envelope::new(kind, data);
        reply.correlation_id = request.correlation_id.clone();
        self.push(&reply);
    }
}

pub struct Harness {
    pub client: WsClient,
    pub events: EventStream,
    pub connector: MockConnector,
    pub sessions: UnboundedReceiver<ServerSide>,
}

impl Harness {
    pub fn new(config: WsConfig) -> Self {
        let (connector, sessions) = MockConnector::new();
        let (client, events) =
            WsClient::new(config, connector.clone()).expect("client construction");
        Self {
            client,
            events,
            connector,
            sessions,
        }
    }

    /// Default config without heartbeats, which would interleave with the
    /// frames a test is looking for.
    pub fn quiet() -> Self {
        Self::new(quiet_config())
    }

    pub async fn next_session(&mut self) -> ServerSide {
        tokio::time::timeout(WAIT, self.sessions.next())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped")
    }

    pub async fn next_event(&mut self) -> ClientEvent {
        tokio::time::timeout(WAIT, self.events.next())
            .await
            .expect("timed out waiting for event")
            .expect("event stream ended")
    }

    /// Connect and wait for the `Connected` event.
    pub async fn open(&mut self) -> ServerSide {
        self.client.connect().await.expect("connect");
        let server = self.next_session().await;
        match self.next_event().await {
            ClientEvent::Connected => {}
            other => panic!("expected Connected, got {other:?}"),
        }
        server
    }

    pub async fn assert_no_event(&mut self, window: Duration) {
        if let Ok(Some(event)) = tokio::time::timeout(window, self.events.next()).await {
            panic!("unexpected event: {event:?}");
        }
    }
}

pub fn quiet_config() -> WsConfig {
    WsConfig::new("ws://mock.invalid/ws").enable_heartbeat(false)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
