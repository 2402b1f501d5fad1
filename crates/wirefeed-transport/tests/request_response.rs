mod common;

use std::time::Duration;

use common::{Harness, quiet_config};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use wirefeed_transport::{ClientEvent, Envelope, TransportError, TransportResult, WsClient};

fn spawn_request(
    client: &WsClient,
    kind: &str,
    expected: &str,
    timeout: Option<Duration>,
) -> tokio::task::JoinHandle<TransportResult<Value>> {
    let client = client.clone();
    let envelope = Envelope::new(kind, json!({"symbol": "BTCUSDT"}));
    let expected = expected.to_string();
    tokio::spawn(async move { client.send_with_response(envelope, expected, timeout).await })
}

#[tokio::test(start_paused = true)]
async fn matching_reply_resolves_with_data() -> TransportResult<()> {
    let mut harness = Harness::quiet();
    let mut server = harness.open().await;

    let request = spawn_request(&harness.client, "create_order", "order_created", None);
    let sent = server.recv().await;
    assert_eq!(sent.kind, "create_order");
    assert_eq!(sent.expect_response.as_deref(), Some("order_created"));
    assert!(sent.correlation_id.is_some());

    server.reply(&sent, "order_created", json!({"orderId": "o-1"}));

    let data = request.await.expect("join")?;
    assert_eq!(data, json!({"orderId": "o-1"}));
    assert_eq!(harness.client.pending_count(), 0);

    // The reply was consumed by the request, not surfaced as an event.
    harness.assert_no_event(Duration::from_secs(1)).await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unanswered_request_times_out_after_ten_seconds() -> TransportResult<()> {
    let mut harness = Harness::quiet();
    let mut server = harness.open().await;
    let started = tokio::time::Instant::now();

    let request = spawn_request(&harness.client, "create_order", "order_created", None);
    server.recv().await;

    match request.await.expect("join") {
        Err(TransportError::RequestTimeout { duration, .. }) => {
            assert_eq!(duration, Duration::from_secs(10));
        }
        other => panic!("expected RequestTimeout, got {other:?}"),
    }
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(harness.client.pending_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn mismatched_reply_rejects_only_its_request() -> TransportResult<()> {
    let mut harness = Harness::quiet();
    let mut server = harness.open().await;

    let first = spawn_request(&harness.client, "create_order", "order_created", None);
    let first_sent = server.recv().await;
    let second = spawn_request(&harness.client, "create_order", "order_created", None);
    let second_sent = server.recv().await;
    assert_ne!(first_sent.correlation_id, second_sent.correlation_id);

    server.reply(&first_sent, "order_modified", json!({}));

    match first.await.expect("join") {
        Err(TransportError::UnexpectedResponseType {
            expected, actual, ..
        }) => {
            assert_eq!(expected, "order_created");
            assert_eq!(actual, "order_modified");
        }
        other => panic!("expected UnexpectedResponseType, got {other:?}"),
    }
    assert_eq!(harness.client.pending_count(), 1);

    server.reply(&second_sent, "order_created", json!({"orderId": "o-2"}));
    assert_eq!(second.await.expect("join")?, json!({"orderId": "o-2"}));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn error_reply_rejects_with_remote_message() -> TransportResult<()> {
    let mut harness = Harness::quiet();
    let mut server = harness.open().await;

    let request = spawn_request(&harness.client, "cancel_order", "order_canceled", None);
    let sent = server.recv().await;
    server.reply(&sent, "error", json!({"message": "unknown order"}));

    match request.await.expect("join") {
        Err(TransportError::Remote { message }) => assert_eq!(message, "unknown order"),
        other => panic!("expected Remote, got {other:?}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn late_reply_is_delivered_as_message() -> TransportResult<()> {
    let mut harness = Harness::quiet();
    let mut server = harness.open().await;

    let request = spawn_request(
        &harness.client,
        "create_order",
        "order_created",
        Some(Duration::from_secs(1)),
    );
    let sent = server.recv().await;
    assert!(matches!(
        request.await.expect("join"),
        Err(TransportError::RequestTimeout { .. })
    ));

    server.reply(&sent, "order_created", json!({"orderId": "late"}));

    match harness.next_event().await {
        ClientEvent::Message(envelope) => {
            assert_eq!(envelope.correlation_id, sent.correlation_id);
            assert_eq!(envelope.data["orderId"], "late");
        }
        other => panic!("expected Message, got {other:?}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn request_sent_while_closed_is_queued() -> TransportResult<()> {
    let mut harness = Harness::quiet();
    let request = spawn_request(&harness.client, "create_order", "order_created", None);
    tokio::task::yield_now().await;

    let mut server = harness.open().await;
    let sent = server.recv().await;
    assert_eq!(sent.kind, "create_order");
    server.reply(&sent, "order_created", json!({"orderId": "o-3"}));

    assert_eq!(request.await.expect("join")?, json!({"orderId": "o-3"}));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn pending_requests_survive_reconnect_by_default() -> TransportResult<()> {
    let mut harness = Harness::quiet();
    let mut server = harness.open().await;

    let request = spawn_request(&harness.client, "create_order", "order_created", None);
    let sent = server.recv().await;
    drop(server);

    loop {
        if let ClientEvent::Connected = harness.next_event().await {
            break;
        }
    }
    let server = harness.next_session().await;
    assert_eq!(harness.client.pending_count(), 1);

    server.reply(&sent, "order_created", json!({"orderId": "o-4"}));
    assert_eq!(request.await.expect("join")?, json!({"orderId": "o-4"}));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn pending_requests_fail_on_close_when_configured() -> TransportResult<()> {
    let mut harness = Harness::new(quiet_config().fail_pending_on_close(true));
    let mut server = harness.open().await;

    let request = spawn_request(&harness.client, "create_order", "order_created", None);
    server.recv().await;
    drop(server);

    assert!(matches!(
        request.await.expect("join"),
        Err(TransportError::ConnectionClosed { .. })
    ));
    assert_eq!(harness.client.pending_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reconnect_exhaustion_rejects_pending_requests() -> TransportResult<()> {
    let mut harness = Harness::new(
        quiet_config()
            .max_reconnect_attempts(1)
            .request_timeout(Duration::from_secs(600)),
    );
    let mut server = harness.open().await;

    let request = spawn_request(&harness.client, "create_order", "order_created", None);
    server.recv().await;
    harness.connector.set_refuse(true);
    drop(server);

    assert!(matches!(
        request.await.expect("join"),
        Err(TransportError::ReconnectExhausted { attempts: 1 })
    ));
    assert_eq!(harness.client.pending_count(), 0);
    Ok(())
}

#[derive(Serialize)]
struct Ping<'a> {
    nonce: &'a str,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Pong {
    nonce: String,
}

#[tokio::test(start_paused = true)]
async fn typed_request_round_trip() -> TransportResult<()> {
    let mut harness = Harness::quiet();
    let mut server = harness.open().await;

    let client = harness.client.clone();
    let request = tokio::spawn(async move {
        client
            .request::<_, Pong>("ping", &Ping { nonce: "n-1" }, "pong")
            .await
    });

    let sent = server.recv().await;
    assert_eq!(sent.data, json!({"nonce": "n-1"}));
    server.reply(&sent, "pong", sent.data.clone());

    assert_eq!(
        request.await.expect("join")?,
        Pong {
            nonce: "n-1".to_string()
        }
    );
    Ok(())
}
