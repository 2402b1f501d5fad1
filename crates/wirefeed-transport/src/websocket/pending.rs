//! Lock-free pending request management using `scc::HashMap`.
//!
//! Every entry leaves the map through exactly one `remove_sync`, so a request
//! is completed at most once no matter which of reply, deadline or sweep gets
//! there first.

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tokio::{sync::oneshot, time::Instant};

use super::{
    config::WsConfig,
    envelope::{Envelope, kinds},
    types::CorrelationId,
};
use crate::error::{TransportError, TransportResult};

/// Receives the outcome of one correlated request.
pub type ResponseReceiver = oneshot::Receiver<TransportResult<Value>>;

/// A pending request awaiting a response.
struct PendingRequest {
    expected: String,
    response_tx: oneshot::Sender<TransportResult<Value>>,
    created_at: Instant,
    timeout: Duration,
}

impl PendingRequest {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) >= self.timeout
    }
}

/// Lock-free store for pending requests.
pub struct PendingRequestStore {
    requests: scc::HashMap<CorrelationId, PendingRequest>,
    config: Arc<WsConfig>,
}

impl PendingRequestStore {
    pub fn new(config: Arc<WsConfig>) -> Self {
        Self {
            requests: scc::HashMap::new(),
            config,
        }
    }

    /// Register a request expecting a reply of type `expected`.
    ///
    /// Returns `None` if capacity is exceeded or the id is already pending.
    pub fn add(
        &self,
        id: CorrelationId,
        expected: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Option<ResponseReceiver> {
        if !self.has_capacity() {
            return None;
        }

        let (tx, rx) = oneshot::channel();
        let pending = PendingRequest {
            expected: expected.into(),
            response_tx: tx,
            created_at: Instant::now(),
            timeout: timeout.unwrap_or(self.config.request_timeout),
        };

        if self.requests.insert_sync(id, pending).is_err() {
            return None;
        }

        Some(rx)
    }

    /// Complete the request `envelope` answers, if any.
    ///
    /// Returns `true` if the envelope was consumed by a pending request.
    pub fn complete(&self, envelope: &Envelope) -> bool {
        let Some(id) = envelope.correlation_id.as_ref() else {
            return false;
        };
        let Some((id, pending)) = self.requests.remove_sync(id) else {
            return false;
        };

        let outcome = if envelope.kind == pending.expected {
            Ok(envelope.data.clone())
        } else if envelope.is_kind(kinds::ERROR) {
            Err(TransportError::remote(error_message(&envelope.data)))
        } else {
            Err(TransportError::unexpected_response_type(
                id.to_string(),
                pending.expected,
                envelope.kind.clone(),
            ))
        };

        // The caller may have given up already.
        let _ = pending.response_tx.send(outcome);
        true
    }

    /// Remove a pending request without notifying the receiver.
    ///
    /// Returns `true` if the request was present.
    pub fn remove(&self, id: &CorrelationId) -> bool {
        self.requests.remove_sync(id).is_some()
    }

    /// Reject every request past its deadline with `RequestTimeout`.
    ///
    /// Returns the number of expired requests.
    pub fn expire_stale(&self) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();

        self.requests.retain_sync(|id, pending| {
            if pending.is_expired(now) {
                expired.push(id.clone());
            }
            true
        });

        expired
            .into_iter()
            .filter_map(|id| self.requests.remove_sync(&id))
            .map(|(id, pending)| {
                let _ = pending
                    .response_tx
                    .send(Err(TransportError::request_timeout(
                        pending.timeout,
                        id.to_string(),
                    )));
            })
            .count()
    }

    /// Reject every pending request with the error `reason` builds.
    pub fn reject_all(&self, reason: impl Fn() -> TransportError) {
        let mut ids = Vec::new();
        self.requests.retain_sync(|id, _| {
            ids.push(id.clone());
            true
        });

        for id in ids {
            if let Some((_, pending)) = self.requests.remove_sync(&id) {
                let _ = pending.response_tx.send(Err(reason()));
            }
        }
    }

    /// Check if there's capacity for more requests.
    pub fn has_capacity(&self) -> bool {
        self.requests.len() < self.config.max_pending_requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

fn error_message(data: &Value) -> String {
    match data {
        Value::String(message) => message.clone(),
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| data.to_string()),
        other => other.to_string(),
    }
}
