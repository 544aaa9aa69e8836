//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use relaylog::config::AppConfig;
use relaylog::http::{AppState, HttpServer};
use relaylog::journal::{LogSink, MemorySink};
use relaylog::lifecycle::Shutdown;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A server running on an ephemeral port. Dropping it shuts the server down.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub config_tx: mpsc::UnboundedSender<AppConfig>,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a server journaling into a fresh [`MemorySink`].
pub async fn start_server(config: AppConfig) -> (TestServer, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let server = start_server_with_sink(config, sink.clone()).await;
    (server, sink)
}

pub async fn start_server_with_sink(mut config: AppConfig, sink: Arc<dyn LogSink>) -> TestServer {
    config.listener.bind_address = "127.0.0.1:0".into();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::with_sink(config, sink);
    let state = server.state().clone();
    let (config_tx, config_rx) = mpsc::unbounded_channel();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        server.run(listener, config_rx, server_shutdown).await.unwrap();
    });

    TestServer {
        addr,
        state,
        config_tx,
        shutdown,
    }
}

/// Poll until `check` holds, panicking after two seconds.
pub async fn wait_until<F>(what: &str, mut check: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait until the registry holds exactly `n` live connections.
pub async fn wait_for_connections(state: &AppState, n: usize) {
    let registry = state.registry.clone();
    wait_until(&format!("{n} live connections"), || registry.len() == n).await;
}

/// Item-route request with both tokens set to their defaults.
pub fn authorized(client: &reqwest::Client, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
    let sep = if url.contains('?') { '&' } else { '?' };
    client
        .request(method, format!("{url}{sep}token=jessica"))
        .header("X-Token", "fake-super-secret-token")
}
