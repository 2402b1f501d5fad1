//! Notifications from the connection actor to the caller.

use std::{
    collections::VecDeque,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::envelope::Envelope;

/// Why the link went down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The caller asked for it via `disconnect`.
    Requested,
    /// The link failed or the peer closed it.
    Lost { reason: String },
}

/// Everything the caller can observe about the channel.
#[derive(Clone, Debug)]
pub enum ClientEvent {
    Connected,
    Disconnected {
        reason: CloseReason,
    },
    /// A transport fault. Informational; recovery is automatic.
    Error {
        message: String,
    },
    Reconnecting {
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
    },
    /// Automatic reconnection gave up. Call `connect` to start over.
    ReconnectExhausted {
        attempts: u32,
    },
    /// An inbound envelope not consumed by a pending request.
    Message(Envelope),
}

/// Stream of [`ClientEvent`]s for one client.
///
/// Ends once the connection actor has stopped.
pub struct EventStream {
    rx: mpsc::Receiver<ClientEvent>,
}

impl EventStream {
    pub(crate) fn new(rx: mpsc::Receiver<ClientEvent>) -> Self {
        Self { rx }
    }

    pub async fn next(&mut self) -> Option<ClientEvent> {
        self.rx.recv().await
    }
}

impl Stream for EventStream {
    type Item = ClientEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.rx).poll_recv(cx)
    }
}

impl ClientEvent {
    /// Lifecycle events are never dropped; only `Message` yields to backpressure.
    fn is_lifecycle(&self) -> bool {
        !matches!(self, Self::Message(_))
    }
}

/// Actor-side sender that never blocks on a slow consumer.
///
/// When the channel is full, lifecycle events wait in a backlog that the actor
/// drains as the consumer catches up, and messages are dropped. While the
/// backlog is non-empty every message is dropped so delivery order holds.
pub(crate) struct EventSink {
    tx: mpsc::Sender<ClientEvent>,
    backlog: VecDeque<ClientEvent>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<ClientEvent>) -> Self {
        Self {
            tx,
            backlog: VecDeque::new(),
        }
    }

    pub(crate) fn emit(&mut self, event: ClientEvent) {
        if !self.backlog.is_empty() {
            if event.is_lifecycle() {
                self.backlog.push_back(event);
            } else {
                warn!(?event, "Dropping client event due to backpressure");
            }
            return;
        }

        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) if event.is_lifecycle() => {
                debug!(?event, "Event channel full; holding lifecycle event");
                self.backlog.push_back(event);
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(?event, "Dropping client event due to backpressure");
            }
            // Nobody is listening.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    /// Deliver the oldest held event once the channel has room.
    ///
    /// Pending forever while the backlog is empty.
    pub(crate) async fn drain(&mut self) {
        if self.backlog.is_empty() {
            return std::future::pending().await;
        }
        match self.tx.reserve().await {
            Ok(permit) => {
                if let Some(event) = self.backlog.pop_front() {
                    permit.send(event);
                }
            }
            Err(_) => self.backlog.clear(),
        }
    }

    #[cfg(test)]
    fn backlog_len(&self) -> usize {
        self.backlog.len()
    }
}
