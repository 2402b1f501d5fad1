//! Connection actor for WebSocket lifecycle management.
//!
//! The actor runs in a background task and is the only owner of the link, the
//! heartbeat and the reconnect timer. It handles:
//! - Connection establishment and bounded reconnection
//! - Heartbeats while open
//! - Queueing while closed and FIFO flush on open
//! - Subscription replay on open
//! - Routing inbound envelopes to pending requests or the event stream
//!
//! Commands, transport frames and timer ticks are handled one at a time from a
//! single `select!` loop, so no state here is ever locked.

use std::{pin::Pin, sync::Arc};

use futures_util::future::BoxFuture;
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::{Instant, Interval, MissedTickBehavior, Sleep, interval, interval_at, sleep},
};
use tracing::{debug, error, info, warn};

use super::{
    config::WsConfig,
    envelope::Envelope,
    events::{ClientEvent, CloseReason, EventSink},
    link::{Connector, Link},
    pending::PendingRequestStore,
    queue::OutboundQueue,
    subscription::SubscriptionRegistry,
    types::{ConnectionState, SubscriptionParams, Topic},
};
use crate::{
    error::{TransportError, TransportResult},
    metrics::ConnectionMetrics,
    reconnect::{ReconnectDecision, ReconnectScheduler},
};

/// Commands sent from [`WsClient`](super::WsClient) handles to the actor.
pub(crate) enum Command {
    Connect,
    Disconnect {
        reply_tx: oneshot::Sender<()>,
    },
    /// Write now if open, queue otherwise.
    Send {
        envelope: Envelope,
    },
    Subscribe {
        topic: Topic,
        params: SubscriptionParams,
        reply_tx: oneshot::Sender<()>,
    },
    Unsubscribe {
        topic: Topic,
        reply_tx: oneshot::Sender<()>,
    },
}

/// State shared between the actor and client handles.
pub(crate) struct Shared {
    pub(crate) pending: Arc<PendingRequestStore>,
    pub(crate) subscriptions: Arc<SubscriptionRegistry>,
    pub(crate) metrics: Arc<ConnectionMetrics>,
}

type ConnectFuture = BoxFuture<'static, TransportResult<Link>>;

pub(crate) struct ConnectionActor {
    config: Arc<WsConfig>,
    connector: Arc<dyn Connector>,
    cmd_rx: mpsc::Receiver<Command>,
    events: EventSink,
    state_tx: watch::Sender<ConnectionState>,
    pending: Arc<PendingRequestStore>,
    subscriptions: Arc<SubscriptionRegistry>,
    metrics: Arc<ConnectionMetrics>,
    queue: OutboundQueue,
    scheduler: ReconnectScheduler,
    link: Option<Link>,
    connecting: Option<ConnectFuture>,
    heartbeat: Option<Interval>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
}

impl ConnectionActor {
    pub(crate) fn new(
        config: Arc<WsConfig>,
        connector: Arc<dyn Connector>,
        cmd_rx: mpsc::Receiver<Command>,
        events: EventSink,
        state_tx: watch::Sender<ConnectionState>,
        shared: Shared,
    ) -> Self {
        let scheduler = ReconnectScheduler::new(config.reconnect_policy());
        Self {
            config,
            connector,
            cmd_rx,
            events,
            state_tx,
            pending: shared.pending,
            subscriptions: shared.subscriptions,
            metrics: shared.metrics,
            queue: OutboundQueue::default(),
            scheduler,
            link: None,
            connecting: None,
            heartbeat: None,
            reconnect_timer: None,
        }
    }

    /// Run until every client handle has been dropped.
    pub(crate) async fn run(mut self) {
        info!(url = %self.config.url, "Starting WebSocket actor");

        let mut sweep = interval(self.config.pending_sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        info!("All client handles dropped; shutting down actor");
                        break;
                    }
                },
                result = poll_connecting(&mut self.connecting) => {
                    self.on_connect_result(result).await;
                }
                frame = next_frame(&mut self.link) => self.on_frame(frame),
                () = tick_heartbeat(&mut self.heartbeat) => self.send_heartbeat().await,
                () = wait_reconnect(&mut self.reconnect_timer) => self.on_reconnect_timer(),
                () = self.events.drain() => {}
                _ = sweep.tick() => {
                    let expired = self.pending.expire_stale();
                    if expired > 0 {
                        debug!(expired, "Expired stale pending requests");
                    }
                }
            }
        }

        self.shutdown().await;
        info!("WebSocket actor stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect => self.connect(),
            Command::Disconnect { reply_tx } => {
                self.disconnect().await;
                let _ = reply_tx.send(());
            }
            Command::Send { envelope } => self.send(envelope).await,
            Command::Subscribe {
                topic,
                params,
                reply_tx,
            } => {
                self.subscribe(topic, params).await;
                let _ = reply_tx.send(());
            }
            Command::Unsubscribe { topic, reply_tx } => {
                self.unsubscribe(topic).await;
                let _ = reply_tx.send(());
            }
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Connection state changed");
        }
    }

    // ---- connection lifecycle ----

    /// Caller-initiated connect. Starts over with a full attempt budget.
    fn connect(&mut self) {
        if self.state().is_open() || self.connecting.is_some() {
            debug!(state = %self.state(), "Connect ignored");
            return;
        }

        self.cancel_reconnect();
        self.scheduler.reset();
        self.start_connect();
    }

    fn start_connect(&mut self) {
        debug!(url = %self.config.url, "Connecting to WebSocket");
        self.set_state(ConnectionState::Connecting);

        let connector = Arc::clone(&self.connector);
        let url = self.config.url.clone();
        let connect_timeout = self.config.connect_timeout;

        self.connecting = Some(Box::pin(async move {
            match tokio::time::timeout(connect_timeout, connector.connect(&url)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::timeout(connect_timeout)),
            }
        }));
    }

    async fn on_connect_result(&mut self, result: TransportResult<Link>) {
        match result {
            Ok(link) => self.on_open(link).await,
            Err(err) => {
                warn!(
                    url = %self.config.url,
                    attempt = self.scheduler.attempt(),
                    error = %err,
                    "Connection failed"
                );
                self.report_error(&err);
                self.on_lost(err.to_string());
            }
        }
    }

    async fn on_open(&mut self, link: Link) {
        self.link = Some(link);
        self.set_state(ConnectionState::Open);
        self.scheduler.reset();
        self.metrics.mark_connected();
        info!(url = %self.config.url, "WebSocket connected");

        self.flush_queue().await;

        if self.config.enable_heartbeat {
            let period = self.config.heartbeat_interval;
            let mut heartbeat = interval_at(Instant::now() + period, period);
            heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.heartbeat = Some(heartbeat);
        }

        self.events.emit(ClientEvent::Connected);
        self.replay_subscriptions().await;
    }

    /// Unexpected loss of the link, or a failed attempt to open one.
    fn on_lost(&mut self, reason: String) {
        self.link = None;
        self.heartbeat = None;
        self.set_state(ConnectionState::Closed);
        self.metrics.record_disconnection();

        if self.config.fail_pending_on_close {
            self.pending
                .reject_all(|| TransportError::connection_closed(Some(reason.clone())));
        }

        self.events.emit(ClientEvent::Disconnected {
            reason: CloseReason::Lost { reason },
        });
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        let max_attempts = self.config.max_reconnect_attempts;
        match self.scheduler.on_close() {
            ReconnectDecision::Retry { attempt, delay } => {
                info!(attempt, max_attempts, ?delay, "Scheduling reconnect");
                self.events.emit(ClientEvent::Reconnecting {
                    attempt,
                    max_attempts,
                    delay,
                });
                self.reconnect_timer = Some(Box::pin(sleep(delay)));
            }
            ReconnectDecision::Exhausted { attempts } => {
                error!(attempts, "Max reconnection attempts exceeded");
                // No reply can arrive until the caller connects again.
                self.pending
                    .reject_all(|| TransportError::reconnect_exhausted(attempts));
                self.events
                    .emit(ClientEvent::ReconnectExhausted { attempts });
            }
            ReconnectDecision::AlreadyScheduled => {
                debug!("Reconnect already scheduled");
            }
        }
    }

    fn on_reconnect_timer(&mut self) {
        self.reconnect_timer = None;
        self.scheduler.disarm();
        self.metrics.record_reconnect();
        self.start_connect();
    }

    fn cancel_reconnect(&mut self) {
        self.reconnect_timer = None;
        self.scheduler.disarm();
    }

    async fn disconnect(&mut self) {
        let link = self.link.take();
        self.connecting = None;
        self.heartbeat = None;
        self.cancel_reconnect();
        self.scheduler.reset();

        if let Some(mut link) = link {
            self.set_state(ConnectionState::Closing);
            if let Err(err) = link.close().await {
                debug!(error = %err, "Error while closing link");
            }
        }
        self.set_state(ConnectionState::Closed);
        self.subscriptions.clear();

        if self.config.fail_pending_on_close {
            self.pending.reject_all(|| {
                TransportError::connection_closed(Some("disconnect requested".to_string()))
            });
        }

        info!(url = %self.config.url, "WebSocket disconnected");
        self.events.emit(ClientEvent::Disconnected {
            reason: CloseReason::Requested,
        });
    }

    async fn shutdown(&mut self) {
        self.connecting = None;
        self.heartbeat = None;
        self.reconnect_timer = None;
        if let Some(mut link) = self.link.take() {
            let _ = link.close().await;
        }
        self.set_state(ConnectionState::Closed);
    }

    fn report_error(&mut self, err: &TransportError) {
        self.metrics.record_error();
        self.events.emit(ClientEvent::Error {
            message: err.to_string(),
        });
    }

    // ---- outbound ----

    async fn write(&mut self, envelope: &Envelope) -> TransportResult<()> {
        let Some(link) = self.link.as_mut() else {
            return Err(TransportError::connection_closed(None));
        };

        link.send(envelope.encode()?).await?;
        self.metrics.record_sent();
        if self.config.enable_logging {
            debug!(kind = %envelope.kind, "Sent envelope");
        }
        Ok(())
    }

    async fn send(&mut self, envelope: Envelope) {
        if !self.state().is_open() {
            if self.config.enable_logging {
                debug!(
                    kind = %envelope.kind,
                    queued = self.queue.len() + 1,
                    "Queued envelope while not connected"
                );
            }
            self.queue.push(envelope);
            return;
        }

        if let Err(err) = self.write(&envelope).await {
            warn!(kind = %envelope.kind, error = %err, "Failed to send envelope; re-queueing");
            self.report_error(&err);
            self.queue.push(envelope);
        }
    }

    async fn flush_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        let queued = self.queue.drain_all();
        if self.config.enable_logging {
            debug!(count = queued.len(), "Flushing outbound queue");
        }

        for envelope in queued {
            if let Err(err) = self.write(&envelope).await {
                warn!(kind = %envelope.kind, error = %err, "Failed to flush envelope; re-queueing");
                self.report_error(&err);
                self.queue.push(envelope);
            }
        }
    }

    /// Control envelopes are written only while open and never queued.
    async fn write_control(&mut self, envelope: Envelope) {
        if let Err(err) = self.write(&envelope).await {
            warn!(kind = %envelope.kind, error = %err, "Failed to send control envelope");
            self.report_error(&err);
        }
    }

    async fn send_heartbeat(&mut self) {
        if let Err(err) = self.write(&Envelope::heartbeat()).await {
            self.metrics.record_error();
            warn!(error = %err, "Failed to send heartbeat");
        }
    }

    async fn subscribe(&mut self, topic: Topic, params: SubscriptionParams) {
        let envelope = Envelope::subscribe(&topic, &params);
        let changed = self.subscriptions.insert(topic, params);
        if changed && self.state().is_open() {
            self.write_control(envelope).await;
        }
    }

    async fn unsubscribe(&mut self, topic: Topic) {
        if self.subscriptions.remove(&topic) && self.state().is_open() {
            self.write_control(Envelope::unsubscribe(&topic)).await;
        }
    }

    async fn replay_subscriptions(&mut self) {
        let entries = self.subscriptions.entries();
        if entries.is_empty() {
            return;
        }

        debug!(count = entries.len(), "Resubscribing to topics");
        for (topic, params) in entries {
            self.write_control(Envelope::subscribe(&topic, &params))
                .await;
        }
    }

    // ---- inbound ----

    fn on_frame(&mut self, frame: Option<TransportResult<String>>) {
        match frame {
            Some(Ok(text)) => self.on_text(&text),
            Some(Err(err)) => {
                warn!(error = %err, "WebSocket read error");
                self.report_error(&err);
                self.on_lost(err.to_string());
            }
            None => {
                info!(url = %self.config.url, "Connection closed by peer");
                self.on_lost("connection closed by peer".to_string());
            }
        }
    }

    fn on_text(&mut self, text: &str) {
        self.metrics.record_received();

        if text.len() > self.config.max_message_size {
            warn!(
                size = text.len(),
                max = self.config.max_message_size,
                "Dropping oversized message"
            );
            return;
        }

        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "Dropping malformed message");
                return;
            }
        };

        if self.config.enable_logging {
            debug!(kind = %envelope.kind, "Received envelope");
        }

        if self.pending.complete(&envelope) {
            return;
        }
        self.events.emit(ClientEvent::Message(envelope));
    }
}

async fn poll_connecting(connecting: &mut Option<ConnectFuture>) -> TransportResult<Link> {
    let Some(fut) = connecting.as_mut() else {
        return std::future::pending().await;
    };
    let result = fut.await;
    *connecting = None;
    result
}

async fn next_frame(link: &mut Option<Link>) -> Option<TransportResult<String>> {
    match link.as_mut() {
        Some(link) => link.next().await,
        None => std::future::pending().await,
    }
}

async fn tick_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat.as_mut() {
        Some(heartbeat) => {
            heartbeat.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn wait_reconnect(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(timer) => timer.as_mut().await,
        None => std::future::pending().await,
    }
}
