//! Coordinated writes through the real HTTP client.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use safewrite_coordinator::diagnostics::{DiagnosticSink, RetryScheduled, WriteGaveUp};
use safewrite_coordinator::{RetryPolicy, WriteCoordinator, WriteFailure};
use safewrite_remote::{RecordClient, RemoteError};
use safewrite_types::{RetryConfig, WriteOptions};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct Counting {
    retries: Mutex<Vec<(String, Option<u16>)>>,
    give_ups: Mutex<Vec<u32>>,
}

impl DiagnosticSink for Counting {
    fn retry_scheduled(&self, event: &RetryScheduled<'_>) {
        self.retries
            .lock()
            .unwrap()
            .push((event.key.to_string(), event.status));
    }

    fn write_gave_up(&self, event: &WriteGaveUp<'_>) {
        self.give_ups.lock().unwrap().push(event.attempts);
    }
}

fn coordinator(sink: &Arc<Counting>) -> WriteCoordinator<(), RemoteError> {
    let config = RetryConfig {
        base: Duration::from_millis(1),
        ..RetryConfig::default()
    }
    .without_jitter();
    WriteCoordinator::new(
        RetryPolicy::new(config).with_sink(Arc::clone(sink) as Arc<dyn DiagnosticSink>),
    )
}

fn options(key: &str) -> WriteOptions {
    WriteOptions::keyed(key)
        .with_pre_wait(Duration::ZERO)
        .with_debounce(Duration::from_millis(30))
}

fn update(
    client: &RecordClient,
    ticket_id: u64,
    value: u32,
) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send>>
+ Send
+ 'static {
    let client = client.clone();
    move || {
        let client = client.clone();
        Box::pin(async move { client.update_custom_field(ticket_id, 9, json!(value)).await })
    }
}

#[tokio::test]
async fn conflict_text_without_conflict_status_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/tickets/1.json"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({"description": "A change was made to this ticket"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/tickets/1.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(Counting::default());
    let client = RecordClient::new(&server.uri(), None).unwrap();
    coordinator(&sink)
        .safe_update(update(&client, 1, 10), &options("ticket-1"))
        .await
        .unwrap();

    let retries = sink.retries.lock().unwrap().clone();
    assert_eq!(retries, vec![("ticket-1".to_string(), Some(422))]);
    assert!(sink.give_ups.lock().unwrap().is_empty());
}

#[tokio::test]
async fn exhausted_transient_failures_return_last_response() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(4)
        .mount(&server)
        .await;

    let sink = Arc::new(Counting::default());
    let client = RecordClient::new(&server.uri(), None).unwrap();
    let err = coordinator(&sink)
        .safe_update(update(&client, 2, 10), &options("ticket-2"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(err.body_text().as_deref(), Some("maintenance"));
    assert_eq!(sink.retries.lock().unwrap().len(), 3);
    assert_eq!(*sink.give_ups.lock().unwrap(), vec![4]);
}

#[tokio::test]
async fn burst_for_one_ticket_sends_only_the_last_value() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/tickets/3.json"))
        .and(wiremock::matchers::body_json(
            json!({"ticket": {"custom_fields": [{"id": 9, "value": 3}]}}),
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(Counting::default());
    let client = RecordClient::new(&server.uri(), None).unwrap();
    let coordinator = coordinator(&sink);
    let options = options("ticket-3").with_debounce(Duration::from_millis(200));

    let handles: Vec<_> = (1..=3)
        .map(|value| coordinator.safe_update(update(&client, 3, value), &options))
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn writes_to_different_tickets_all_land() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(20)))
        .expect(3)
        .mount(&server)
        .await;

    let sink = Arc::new(Counting::default());
    let client = RecordClient::new(&server.uri(), None).unwrap();
    let coordinator = coordinator(&sink);

    let handles: Vec<_> = (10..13)
        .map(|id| coordinator.safe_update(update(&client, id, 1), &options(&format!("ticket-{id}"))))
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let mut paths: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "/api/v2/tickets/10.json",
            "/api/v2/tickets/11.json",
            "/api/v2/tickets/12.json"
        ]
    );
}
