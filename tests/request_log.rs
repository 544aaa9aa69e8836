//! Journal behaviour end to end.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use relaylog::config::AppConfig;
use relaylog::journal::{Direction, FileSink, LogEntry, LogSink, LogSinkUnavailable, MemorySink};
use reqwest::StatusCode;
use tokio_tungstenite::tungstenite::Message;

mod common;

/// Accepts input entries, refuses output entries.
#[derive(Default)]
struct OutputFailsSink {
    inner: MemorySink,
}

#[async_trait]
impl LogSink for OutputFailsSink {
    async fn append(&self, entry: &LogEntry) -> Result<(), LogSinkUnavailable> {
        match entry.direction {
            Direction::Input => self.inner.append(entry).await,
            Direction::Output => Err(std::io::Error::other("disk full").into()),
        }
    }
}

fn is_well_formed(line: &str) -> bool {
    let Some((timestamp, rest)) = line.split_once(": ") else {
        return false;
    };
    chrono::DateTime::parse_from_rfc3339(timestamp).is_ok()
        && (rest.starts_with("Input: ") || rest.starts_with("Output: "))
        && rest.contains(", method: ")
        && rest.contains(", clienthost: ")
        && rest.contains(", decoded_body: ")
        && line.ends_with('\n')
        && line.matches('\n').count() == 1
}

#[tokio::test]
async fn exchange_writes_input_then_output() {
    let (server, sink) = common::start_server(AppConfig::default()).await;

    let resp = reqwest::get(server.url("/?page=1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(": Input: /?page=1, method: GET, clienthost: 127.0.0.1, "));
    assert!(lines[0].ends_with("decoded_body: \n"));
    assert!(lines[1].contains(": Output: /?page=1, method: GET, clienthost: 127.0.0.1, "));
    assert!(lines[1].ends_with("decoded_body: {\"Hello\":\"World\"}\n"));
    assert!(lines.iter().all(|line| is_well_formed(line)));
}

#[tokio::test]
async fn request_body_is_journaled_and_still_reaches_handler() {
    let (server, sink) = common::start_server(AppConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/items/?token=jessica"))
        .header("X-Token", "fake-super-secret-token")
        .header("content-type", "application/json")
        .body("{\n\"id\": \"meeseeks\", \"title\": \"Mr\"}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(server.state.items.get("meeseeks").is_some());

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("(\"x-token\", \"fake-super-secret-token\")"));
    assert!(lines[0].ends_with("decoded_body: {\\n\"id\": \"meeseeks\", \"title\": \"Mr\"}\n"));
}

#[tokio::test]
async fn handler_error_is_journaled_as_output() {
    let (server, sink) = common::start_server(AppConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(server.url("/items/nope?token=jessica"))
        .header("X-Token", "fake-super-secret-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains(": Output: /items/nope?token=jessica, method: GET"));
    assert!(lines[1].ends_with("decoded_body: {\"detail\":\"Item not found\"}\n"));
}

#[tokio::test]
async fn failed_output_append_does_not_reach_client() {
    let sink = Arc::new(OutputFailsSink::default());
    let server = common::start_server_with_sink(AppConfig::default(), sink.clone()).await;

    let resp = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "{\"Hello\":\"World\"}");

    assert_eq!(sink.inner.lines().len(), 1);
    assert_eq!(server.state.errors.total(), 1);
    assert!(server.state.errors.recent()[0].message.contains("disk full"));
}

#[tokio::test]
async fn disabled_journal_writes_nothing() {
    let mut config = AppConfig::default();
    config.request_log.enabled = false;
    let (server, sink) = common::start_server(config).await;

    let resp = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(sink.lines().is_empty());
}

#[tokio::test]
async fn websocket_traffic_is_not_journaled() {
    let (server, sink) = common::start_server(AppConfig::default()).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(server.ws_url("/ws"))
        .await
        .unwrap();
    socket.send(Message::Text("quiet".into())).await.unwrap();
    let reply = socket.next().await.unwrap().unwrap();
    assert_eq!(reply.to_text().unwrap(), "Message text was: quiet");

    assert!(sink.lines().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_keep_file_lines_whole() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.txt");
    let server = common::start_server_with_sink(AppConfig::default(), Arc::new(FileSink::new(&path))).await;
    let client = reqwest::Client::new();

    let requests: Vec<_> = (0..32)
        .map(|i| {
            let client = client.clone();
            let url = server.url(&format!("/?n={i}"));
            tokio::spawn(async move { client.get(url).send().await.unwrap().status() })
        })
        .collect();
    for request in requests {
        assert_eq!(request.await.unwrap(), StatusCode::OK);
    }

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    let lines: Vec<String> = content.split_inclusive('\n').map(str::to_string).collect();
    assert_eq!(lines.len(), 64);
    assert!(lines.iter().all(|line| is_well_formed(line)));

    for i in 0..32 {
        let url = format!(": /?n={i}, ");
        let inputs = lines.iter().filter(|l| l.contains(&format!("Input{url}"))).count();
        let outputs = lines.iter().filter(|l| l.contains(&format!("Output{url}"))).count();
        assert_eq!((inputs, outputs), (1, 1), "request {i}");
    }
}

/// Takes `delay` to accept every entry.
struct SlowSink {
    inner: MemorySink,
    delay: std::time::Duration,
}

#[async_trait]
impl LogSink for SlowSink {
    async fn append(&self, entry: &LogEntry) -> Result<(), LogSinkUnavailable> {
        tokio::time::sleep(self.delay).await;
        self.inner.append(entry).await
    }
}

#[tokio::test]
async fn long_response_reaches_client_whole_and_entry_is_cut() {
    let mut config = AppConfig::default();
    config.request_log.max_body_bytes = 8;
    let (server, sink) = common::start_server(config).await;

    let resp = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "{\"Hello\":\"World\"}");

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| is_well_formed(line)));
    assert!(lines[1].ends_with("decoded_body: {\"Hello\" [truncated 9 bytes]\n"));
}

#[tokio::test]
async fn long_request_reaches_handler_whole_and_entry_is_cut() {
    let mut config = AppConfig::default();
    config.request_log.max_body_bytes = 16;
    let (server, sink) = common::start_server(config).await;
    let client = reqwest::Client::new();

    let title = "t".repeat(200);
    let resp = common::authorized(&client, reqwest::Method::POST, server.url("/items/"))
        .json(&serde_json::json!({ "id": "long", "title": title }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(server.state.items.get("long").unwrap().title, title);

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| is_well_formed(line)));
    assert!(lines[0].contains("decoded_body: {\"id\":\"long\",\"ti [truncated "));
}

#[tokio::test]
async fn body_over_security_limit_is_rejected_and_journaled() {
    let mut config = AppConfig::default();
    config.security.max_body_size = 64;
    let (server, sink) = common::start_server(config).await;
    let client = reqwest::Client::new();

    let resp = common::authorized(&client, reqwest::Method::POST, server.url("/items/"))
        .header("content-type", "application/json")
        .body("x".repeat(256))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| is_well_formed(line)));
    assert!(lines[0].contains(": Input: /items/?token=jessica, method: POST"));
    assert!(lines[1].contains(": Output: /items/?token=jessica, method: POST"));
}

#[tokio::test]
async fn slow_sink_does_not_count_against_request_timeout() {
    let mut config = AppConfig::default();
    config.timeouts.request_secs = 1;
    config.request_log.append_timeout_ms = 5000;
    let sink = Arc::new(SlowSink {
        inner: MemorySink::new(),
        delay: std::time::Duration::from_millis(700),
    });
    let server = common::start_server_with_sink(config, sink.clone()).await;

    let resp = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let lines = sink.inner.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(": Input: /health, "));
    assert!(lines[1].contains(": Output: /health, "));
    assert_eq!(server.state.errors.total(), 0);
}
