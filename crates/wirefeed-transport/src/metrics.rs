//! Connection counters.
//!
//! The actor updates these synchronously while it handles events; callers read
//! a [`MetricsSnapshot`].

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

/// Live counters shared between the connection actor and client handles.
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    total_messages: AtomicU64,
    sent_messages: AtomicU64,
    received_messages: AtomicU64,
    disconnections: AtomicU64,
    reconnects: AtomicU64,
    errors: AtomicU64,
    // Milliseconds since the epoch; 0 until the first open.
    last_connected_ms: AtomicI64,
}

/// Point-in-time copy of [`ConnectionMetrics`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_messages: u64,
    pub sent_messages: u64,
    pub received_messages: u64,
    pub disconnections: u64,
    pub reconnects: u64,
    pub errors: u64,
    pub last_connected_at: Option<DateTime<Utc>>,
}

impl ConnectionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_sent(&self) {
        self.sent_messages.fetch_add(1, Ordering::Relaxed);
        self.total_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self) {
        self.received_messages.fetch_add(1, Ordering::Relaxed);
        self.total_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_disconnection(&self) {
        self.disconnections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset message counters and stamp the connection time.
    ///
    /// Disconnection, reconnect and error counters survive across connections.
    pub(crate) fn mark_connected(&self) {
        self.total_messages.store(0, Ordering::Relaxed);
        self.sent_messages.store(0, Ordering::Relaxed);
        self.received_messages.store(0, Ordering::Relaxed);
        self.last_connected_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let last_connected_ms = self.last_connected_ms.load(Ordering::Relaxed);
        let last_connected_at = if last_connected_ms == 0 {
            None
        } else {
            Utc.timestamp_millis_opt(last_connected_ms).single()
        };

        MetricsSnapshot {
            total_messages: self.total_messages.load(Ordering::Relaxed),
            sent_messages: self.sent_messages.load(Ordering::Relaxed),
            received_messages: self.received_messages.load(Ordering::Relaxed),
            disconnections: self.disconnections.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            last_connected_at,
        }
    }
}

#[cfg(feature = "otel")]
pub mod otel {
    //! OTLP export of the connection counters.

    use std::{sync::Arc, time::Duration};

    use opentelemetry::{
        global,
        metrics::{Meter, ObservableCounter},
    };
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};

    use super::ConnectionMetrics;
    use crate::error::{TransportError, TransportResult};

    /// Install a global meter provider exporting over OTLP/gRPC every 15 seconds.
    pub fn init_metrics(endpoint: &str) -> TransportResult<SdkMeterProvider> {
        let exporter = opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| {
                TransportError::config(format!("Failed to create OTLP metrics exporter: {e}"))
            })?;

        let reader = PeriodicReader::builder(exporter)
            .with_interval(Duration::from_secs(15))
            .build();

        let provider = SdkMeterProvider::builder().with_reader(reader).build();
        global::set_meter_provider(provider.clone());

        Ok(provider)
    }

    /// Instruments observing one client's counters; keep alive while exporting.
    pub struct MetricsInstruments {
        _counters: Vec<ObservableCounter<u64>>,
    }

    /// Register observable counters that read `metrics` on every collection.
    pub fn register(meter: &Meter, metrics: Arc<ConnectionMetrics>) -> MetricsInstruments {
        let counter = |name: &'static str, read: fn(&ConnectionMetrics) -> u64| {
            let metrics = Arc::clone(&metrics);
            meter
                .u64_observable_counter(name)
                .with_callback(move |observer| observer.observe(read(&metrics), &[]))
                .build()
        };

        MetricsInstruments {
            _counters: vec![
                counter("wirefeed.messages.total", |m| m.snapshot().total_messages),
                counter("wirefeed.messages.sent", |m| m.snapshot().sent_messages),
                counter("wirefeed.messages.received", |m| {
                    m.snapshot().received_messages
                }),
                counter("wirefeed.disconnections", |m| m.snapshot().disconnections),
                counter("wirefeed.reconnects", |m| m.snapshot().reconnects),
                counter("wirefeed.errors", |m| m.snapshot().errors),
            ],
        }
    }
}
