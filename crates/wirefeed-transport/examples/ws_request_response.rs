//! WebSocket Request-Response Example
//!
//! Connects to an endpoint speaking the envelope protocol, sends one correlated
//! request and logs every event until interrupted.
//!
//! Run with: `cargo run -p wirefeed-transport --example ws_request_response -- ws://127.0.0.1:9001/ws`

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wirefeed_transport::{ClientEvent, WsClient, WsConfig};

#[derive(Debug, Serialize)]
struct ServerTimeRequest {
    zone: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerTime {
    server_time: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:9001/ws".to_string());

    let config = WsConfig::new(url)
        .request_timeout(Duration::from_secs(5))
        .heartbeat_interval(Duration::from_secs(15));
    let (client, mut events) = WsClient::with_tungstenite(config)?;
    // Export counters when built with `--features otel` and an endpoint is set.
    #[cfg(feature = "otel")]
    let _instruments = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(endpoint) => {
            let _provider = wirefeed_transport::metrics::otel::init_metrics(&endpoint)?;
            let meter = opentelemetry::global::meter("wirefeed");
            Some(wirefeed_transport::metrics::otel::register(
                &meter,
                client.metrics_handle(),
            ))
        }
        Err(_) => None,
    };

    client.connect().await?;

    let requester = client.clone();
    tokio::spawn(async move {
        match requester
            .request::<_, ServerTime>("server_time", &ServerTimeRequest { zone: "UTC" }, "server_time_ack")
            .await
        {
            Ok(time) => info!(server_time = time.server_time, "Server time received"),
            Err(e) => warn!(error = %e, "Server time request failed"),
        }
    });

    while let Some(event) = events.next().await {
        match event {
            ClientEvent::Message(envelope) => {
                info!(kind = %envelope.kind, data = %envelope.data, "Message");
            }
            ClientEvent::ReconnectExhausted { attempts } => {
                warn!(attempts, "Giving up");
                break;
            }
            other => info!(?other, "Event"),
        }
    }

    info!(metrics = ?client.metrics(), "Done");
    Ok(())
}
