//! The JSON wire envelope.
//!
//! Every frame in either direction is one envelope:
//!
//! ```text
//! { "type": "...", "data": ..., "timestamp": 1700000000000,
//!   "correlationId"?: "...", "expectResponse"?: "...", "source"?: "..." }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{CorrelationId, SubscriptionParams, Topic};
use crate::error::TransportResult;

/// Envelope type names the channel itself produces or interprets.
pub mod kinds {
    pub const SUBSCRIBE: &str = "subscribe";
    pub const UNSUBSCRIBE: &str = "unsubscribe";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const SUBSCRIPTION_ACK: &str = "subscription_ack";
    pub const ERROR: &str = "error";
}

/// Lenient decoding for millisecond timestamps.
///
/// Accepts any JSON number (fractional and exponent forms are truncated toward
/// zero) and treats `null` as `0`. Use with
/// `#[serde(default, deserialize_with = "millis::deserialize")]`.
pub mod millis {
    use serde::{Deserialize, Deserializer};
    use serde_json::Number;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(number) = Option::<Number>::deserialize(deserializer)? else {
            return Ok(0);
        };
        if let Some(ms) = number.as_i64() {
            return Ok(ms);
        }
        if let Some(ms) = number.as_u64() {
            return Ok(i64::try_from(ms).unwrap_or(i64::MAX));
        }
        // Saturating cast.
        Ok(number.as_f64().map_or(0, |ms| ms as i64))
    }
}

/// A typed message frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    /// Milliseconds since the Unix epoch.
    #[serde(default, deserialize_with = "millis::deserialize")]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Envelope {
    /// Create an envelope stamped with the current time.
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: now_millis(),
            correlation_id: None,
            expect_response: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach correlation fields for a request awaiting `expected`.
    #[must_use]
    pub fn correlated(mut self, id: CorrelationId, expected: impl Into<String>) -> Self {
        self.correlation_id = Some(id);
        self.expect_response = Some(expected.into());
        self
    }

    /// `subscribe` control envelope; `data` is the params with `topic` set.
    pub fn subscribe(topic: &Topic, params: &SubscriptionParams) -> Self {
        let mut data = params.clone();
        data.insert("topic".to_string(), Value::String(topic.to_string()));
        Self::new(kinds::SUBSCRIBE, Value::Object(data))
    }

    pub fn unsubscribe(topic: &Topic) -> Self {
        Self::new(
            kinds::UNSUBSCRIBE,
            serde_json::json!({ "topic": topic.as_str() }),
        )
    }

    pub fn heartbeat() -> Self {
        let timestamp = now_millis();
        Self {
            timestamp,
            ..Self::new(kinds::HEARTBEAT, serde_json::json!({ "timestamp": timestamp }))
        }
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Serialize to a JSON text frame.
    pub fn encode(&self) -> TransportResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON text frame.
    pub fn decode(text: &str) -> TransportResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
