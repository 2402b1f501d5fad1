//! WebSocket connection configuration.

use std::time::Duration;

use crate::reconnect::ReconnectPolicy;

/// Configuration for WebSocket connections.
#[derive(Clone, Debug)]
pub struct WsConfig {
    // URL
    /// WebSocket endpoint URL.
    pub url: String,

    // Reconnection settings
    /// Fixed delay between an unexpected close and the next attempt.
    pub reconnect_interval: Duration,
    /// Consecutive reconnection attempts before giving up for the session.
    pub max_reconnect_attempts: u32,

    // Heartbeat settings
    /// Whether to send heartbeat envelopes while open.
    pub enable_heartbeat: bool,
    /// Interval between heartbeat envelopes.
    pub heartbeat_interval: Duration,

    // Request handling
    /// Default deadline for correlated requests.
    pub request_timeout: Duration,
    /// Maximum number of pending requests.
    pub max_pending_requests: usize,
    /// Interval for expiring pending requests whose caller went away.
    pub pending_sweep_interval: Duration,
    /// Reject pending requests as soon as the connection closes instead of
    /// letting them run out their own deadline.
    pub fail_pending_on_close: bool,

    // Channels
    /// Capacity of command channel.
    pub command_channel_capacity: usize,
    /// Capacity of event channel.
    pub event_channel_capacity: usize,

    // Connection
    /// Timeout for a single connection attempt.
    pub connect_timeout: Duration,
    /// Maximum inbound message size in bytes.
    pub max_message_size: usize,
    /// Emit per-message trace logs.
    pub enable_logging: bool,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            reconnect_interval: Duration::from_millis(5000),
            max_reconnect_attempts: 10,
            enable_heartbeat: true,
            heartbeat_interval: Duration::from_millis(30_000),
            request_timeout: Duration::from_millis(10_000),
            max_pending_requests: 1000,
            pending_sweep_interval: Duration::from_secs(1),
            fail_pending_on_close: false,
            command_channel_capacity: 64,
            event_channel_capacity: 256,
            connect_timeout: Duration::from_secs(10),
            max_message_size: 16 * 1024 * 1024, // 16 MB
            enable_logging: true,
        }
    }
}

impl WsConfig {
    /// Create a new configuration with the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the reconnection interval.
    #[must_use]
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Set the maximum reconnection attempts.
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Enable or disable heartbeats.
    #[must_use]
    pub fn enable_heartbeat(mut self, enabled: bool) -> Self {
        self.enable_heartbeat = enabled;
        self
    }

    /// Set the heartbeat interval.
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the maximum pending requests.
    #[must_use]
    pub fn max_pending_requests(mut self, max: usize) -> Self {
        self.max_pending_requests = max;
        self
    }

    /// Set whether pending requests fail when the connection closes.
    #[must_use]
    pub fn fail_pending_on_close(mut self, fail: bool) -> Self {
        self.fail_pending_on_close = fail;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Set the maximum inbound message size.
    #[must_use]
    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Enable or disable per-message logging.
    #[must_use]
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    pub(crate) fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            interval: self.reconnect_interval,
            max_attempts: self.max_reconnect_attempts,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("URL cannot be empty".to_string());
        }
        self.reconnect_policy().validate()?;
        if self.enable_heartbeat && self.heartbeat_interval.is_zero() {
            return Err("Heartbeat interval must be > 0".to_string());
        }
        if self.request_timeout.is_zero() {
            return Err("Request timeout must be > 0".to_string());
        }
        if self.pending_sweep_interval.is_zero() {
            return Err("Pending sweep interval must be > 0".to_string());
        }
        if self.connect_timeout.is_zero() {
            return Err("Connect timeout must be > 0".to_string());
        }
        if self.max_pending_requests == 0 {
            return Err("Max pending requests must be > 0".to_string());
        }
        if self.command_channel_capacity == 0 {
            return Err("Command channel capacity must be > 0".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err("Event channel capacity must be > 0".to_string());
        }
        Ok(())
    }
}
