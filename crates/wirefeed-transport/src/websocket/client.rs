//! Cloneable handle to a connection actor.

use std::{sync::Arc, time::Duration};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use super::{
    actor::{Command, ConnectionActor, Shared},
    config::WsConfig,
    envelope::Envelope,
    events::{EventSink, EventStream},
    link::Connector,
    pending::PendingRequestStore,
    subscription::SubscriptionRegistry,
    types::{ConnectionState, CorrelationId, SubscriptionParams, Topic},
};
use crate::{
    error::{TransportError, TransportResult},
    metrics::{ConnectionMetrics, MetricsSnapshot},
};

/// Client for one resilient WebSocket channel.
///
/// Cheap to clone; all clones drive the same connection. The connection actor
/// stops once every clone has been dropped.
///
/// # Example
///
/// ```rust,ignore
/// use wirefeed_transport::{WsClient, WsConfig, ClientEvent};
///
/// let (client, mut events) = WsClient::with_tungstenite(WsConfig::new("ws://feed.example.com/ws"))?;
/// client.subscribe("trade.BTCUSDT", Default::default()).await?;
/// client.connect().await?;
///
/// while let Some(event) = events.next().await {
///     if let ClientEvent::Message(envelope) = event {
///         println!("{} {}", envelope.kind, envelope.data);
///     }
/// }
/// ```
#[derive(Clone)]
pub struct WsClient {
    cmd_tx: mpsc::Sender<Command>,
    pending: Arc<PendingRequestStore>,
    subscriptions: Arc<SubscriptionRegistry>,
    metrics: Arc<ConnectionMetrics>,
    state_rx: watch::Receiver<ConnectionState>,
    config: Arc<WsConfig>,
}

impl WsClient {
    /// Validate `config` and spawn the connection actor on the current runtime.
    ///
    /// The client starts closed; call [`connect`](Self::connect) to open it.
    pub fn new<C: Connector>(config: WsConfig, connector: C) -> TransportResult<(Self, EventStream)> {
        Self::with_connector(config, Arc::new(connector))
    }

    pub fn with_connector(
        config: WsConfig,
        connector: Arc<dyn Connector>,
    ) -> TransportResult<(Self, EventStream)> {
        config.validate().map_err(TransportError::config)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::internal(format!("No Tokio runtime: {e}")))?;

        let config = Arc::new(config);
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_channel_capacity);
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Closed);
        let pending = Arc::new(PendingRequestStore::new(Arc::clone(&config)));
        let subscriptions = Arc::new(SubscriptionRegistry::new());
        let metrics = Arc::new(ConnectionMetrics::new());

        let actor = ConnectionActor::new(
            Arc::clone(&config),
            connector,
            cmd_rx,
            EventSink::new(event_tx),
            state_tx,
            Shared {
                pending: Arc::clone(&pending),
                subscriptions: Arc::clone(&subscriptions),
                metrics: Arc::clone(&metrics),
            },
        );
        runtime.spawn(actor.run());

        let client = Self {
            cmd_tx,
            pending,
            subscriptions,
            metrics,
            state_rx,
            config,
        };
        Ok((client, EventStream::new(event_rx)))
    }

    /// Like [`new`](Self::new) with the `tokio-tungstenite` connector.
    #[cfg(feature = "tungstenite")]
    pub fn with_tungstenite(config: WsConfig) -> TransportResult<(Self, EventStream)> {
        Self::new(config, super::link::TungsteniteConnector)
    }

    async fn command(&self, cmd: Command) -> TransportResult<()> {
        self.cmd_tx.send(cmd).await.map_err(|_| {
            TransportError::connection_closed(Some("connection actor stopped".to_string()))
        })
    }

    async fn command_with_reply<F>(&self, build: F) -> TransportResult<()>
    where
        F: FnOnce(oneshot::Sender<()>) -> Command,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command(build(reply_tx)).await?;
        reply_rx.await.map_err(|_| {
            TransportError::connection_closed(Some("connection actor stopped".to_string()))
        })
    }

    /// Start connecting. Does nothing while open or while an attempt is in flight.
    ///
    /// Returns once the actor has the command; watch [`state_changes`](Self::state_changes)
    /// or the event stream to learn the outcome.
    pub async fn connect(&self) -> TransportResult<()> {
        self.command(Command::Connect).await
    }

    /// Close the link, cancel timers and forget all subscriptions.
    pub async fn disconnect(&self) -> TransportResult<()> {
        self.command_with_reply(|reply_tx| Command::Disconnect { reply_tx })
            .await
    }

    /// Send an envelope, queueing it until the next open if necessary.
    pub async fn send(&self, envelope: Envelope) -> TransportResult<()> {
        self.command(Command::Send { envelope }).await
    }

    /// Send `envelope` and wait for the reply of type `expected`.
    ///
    /// Resolves with the reply's `data`. Rejects with `UnexpectedResponseType`
    /// if a reply of another type arrives, `Remote` if the reply is an `error`
    /// envelope and `RequestTimeout` after `timeout` (default
    /// [`WsConfig::request_timeout`]).
    pub async fn send_with_response(
        &self,
        envelope: Envelope,
        expected: impl Into<String>,
        timeout: Option<Duration>,
    ) -> TransportResult<Value> {
        let expected = expected.into();
        let duration = timeout.unwrap_or(self.config.request_timeout);
        let id = CorrelationId::new();

        let mut rx = self
            .pending
            .add(id.clone(), expected.clone(), Some(duration))
            .ok_or_else(|| {
                TransportError::capacity_exceeded(format!(
                    "{} requests already pending",
                    self.config.max_pending_requests
                ))
            })?;

        let envelope = envelope.correlated(id.clone(), expected);
        if let Err(err) = self.command(Command::Send { envelope }).await {
            self.pending.remove(&id);
            return Err(err);
        }

        let outcome = match tokio::time::timeout(duration, &mut rx).await {
            Ok(outcome) => outcome,
            Err(_) => {
                if self.pending.remove(&id) {
                    debug!(correlation_id = %id, ?duration, "Request timed out");
                    return Err(TransportError::request_timeout(duration, id.to_string()));
                }
                // Completed concurrently with the deadline.
                rx.await
            }
        };

        outcome.map_err(|_| TransportError::internal("Response channel dropped"))?
    }

    /// Send a typed request and decode the typed reply.
    pub async fn request<Req, Resp>(
        &self,
        kind: &str,
        payload: &Req,
        expected: &str,
    ) -> TransportResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let envelope = Envelope::new(kind, serde_json::to_value(payload)?);
        let data = self.send_with_response(envelope, expected, None).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Track `topic` and, if open, subscribe to it now.
    ///
    /// Tracked topics are resubscribed after every reconnect.
    pub async fn subscribe(&self, topic: &str, params: SubscriptionParams) -> TransportResult<()> {
        let topic = Topic::parse(topic)?;
        self.command_with_reply(|reply_tx| Command::Subscribe {
            topic,
            params,
            reply_tx,
        })
        .await
    }

    /// Stop tracking `topic` and, if open, unsubscribe from it now.
    pub async fn unsubscribe(&self, topic: &str) -> TransportResult<()> {
        let topic = Topic::parse(topic)?;
        self.command_with_reply(|reply_tx| Command::Unsubscribe { topic, reply_tx })
            .await
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Receiver notified on every state transition.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Wait until the connection reaches `state`.
    pub async fn wait_for_state(&self, state: ConnectionState) -> TransportResult<()> {
        let mut rx = self.state_rx.clone();
        rx.wait_for(|current| *current == state)
            .await
            .map(|_| ())
            .map_err(|_| {
                TransportError::connection_closed(Some("connection actor stopped".to_string()))
            })
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Shared counters, e.g. for registering exporters.
    pub fn metrics_handle(&self) -> Arc<ConnectionMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn subscribed_topics(&self) -> Vec<Topic> {
        self.subscriptions.topics()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }
}
