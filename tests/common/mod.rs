//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use web_honeypot::config::HoneypotConfig;
use web_honeypot::lifecycle::{Harness, HarnessError, HarnessHandle, LifecycleState};
use web_honeypot::signatures::RuleScorer;
use web_honeypot::telemetry::{LogRecord, TelemetryError, TelemetrySink};
use web_honeypot::tunnel::TunnelManager;

/// Telemetry sink that keeps every record in memory.
#[derive(Default)]
pub struct RecordingSink {
    pub records: Mutex<Vec<LogRecord>>,
    pub starts: AtomicU32,
    pub shutdowns: AtomicU32,
    /// Number of `start` calls that fail before one succeeds.
    pub failing_starts: AtomicU32,
}

impl RecordingSink {
    pub fn failing(times: u32) -> Self {
        Self {
            failing_starts: AtomicU32::new(times),
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Wait for at least `count` records; workers enqueue after responding.
    pub async fn wait_for_records(&self, count: usize) -> Vec<LogRecord> {
        for _ in 0..100 {
            let records = self.records();
            if records.len() >= count {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.records()
    }
}

impl TelemetrySink for RecordingSink {
    async fn start(&self) -> Result<(), TelemetryError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failing_starts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_starts.store(remaining - 1, Ordering::SeqCst);
            return Err(TelemetryError::Status(503));
        }
        Ok(())
    }

    fn enqueue(&self, record: LogRecord) {
        self.records.lock().unwrap().push(record);
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Tunnel manager that only counts calls.
#[derive(Default)]
pub struct NoopTunnel {
    pub starts: AtomicU32,
    pub shutdowns: AtomicU32,
    pub last_port: AtomicU32,
}

impl TunnelManager for NoopTunnel {
    fn start(&self, _delay: Duration, port: u16) -> Option<JoinHandle<()>> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.last_port.store(u32::from(port), Ordering::SeqCst);
        None
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

pub const SIGNATURES: &str = r#"[
    {"id": 10, "name": "wordpress login", "responses": [2],
     "rules": [{"attribute": "path", "condition": "starts_with", "value": "/wp-login"}]},
    {"id": 20, "name": "scanner", "responses": [3],
     "rules": [{"attribute": "user_agent", "condition": "contains", "value": "sqlmap", "ignore_case": true}]}
]"#;

pub const RESPONSES: &str = r#"{
    "1": {"headers": {"Server": "*{*banner*}*"}, "body": "<html><body>It works!</body></html>"},
    "2": {"status_code": 200, "headers": {"Server": "*{*banner*}*", "Content-Type": "text/html; charset=UTF-8"},
          "body": "<html><title>Log In</title><p>*{*site_name*}*</p></html>"},
    "3": {"status_code": 403, "body": "Forbidden"}
}"#;

pub const CUSTOMIZATIONS: &str = r#"{"banner": "Apache/2.4.41 (Ubuntu)", "site_name": "Acme Blog"}"#;

/// Data files in a temporary directory plus a config pointing at them.
pub struct Fixture {
    pub dir: TempDir,
    pub config: HoneypotConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "signatures.json", SIGNATURES);
        write(dir.path(), "responses.json", RESPONSES);
        write(dir.path(), "customizations.json", CUSTOMIZATIONS);

        let mut config = HoneypotConfig::default();
        config.listener.bind_address = "127.0.0.1".into();
        config.listener.port = 0;
        config.listener.io_timeout_secs = 5;
        config.listener.drain_timeout_secs = 2;
        config.telemetry.start_retry_secs = 1;
        config.tunnel.enabled = false;
        config.tunnel.startup_delay_secs = 0;
        config.data.signatures_path = dir.path().join("signatures.json");
        config.data.responses_path = dir.path().join("responses.json");
        config.data.customizations_path = dir.path().join("customizations.json");

        Self { dir, config }
    }

    pub fn rewrite(&self, name: &str, content: &str) {
        write(self.dir.path(), name, content);
    }
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

pub struct Running {
    pub handle: HarnessHandle,
    pub task: JoinHandle<Result<(), HarnessError>>,
    pub addr: SocketAddr,
}

/// Spawn a harness and wait until it is listening.
pub async fn start_harness<S: TelemetrySink>(
    config: HoneypotConfig,
    sink: Arc<S>,
    tunnel: Arc<NoopTunnel>,
) -> Running {
    let harness = Harness::new(config, sink, tunnel, Arc::new(RuleScorer));
    let mut handle = harness.handle();
    let task = tokio::spawn(harness.run());

    let listening = tokio::time::timeout(Duration::from_secs(10), handle.wait_for(LifecycleState::Listening))
        .await
        .expect("harness did not start in time");
    assert!(listening);
    let addr = handle.local_addr().expect("listener address");
    Running { handle, task, addr }
}

impl Running {
    pub async fn stop(self) -> HarnessHandle {
        self.handle.control().shutdown();
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("harness did not stop in time")
            .unwrap()
            .unwrap();
        self.handle
    }
}

/// Send raw bytes and read until the honeypot closes the connection.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

pub async fn get(addr: SocketAddr, path: &str, user_agent: &str) -> String {
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nUser-Agent: {user_agent}\r\n\r\n");
    send_raw(addr, request.as_bytes()).await
}

/// Minimal collector answering `GET /health` and recording `POST /ingest` bodies.
pub struct MockCollector {
    pub addr: SocketAddr,
    pub batches: Arc<Mutex<Vec<Value>>>,
    pub auth: Arc<Mutex<Vec<Option<String>>>>,
}

impl MockCollector {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let batches = Arc::new(Mutex::new(Vec::new()));
        let auth = Arc::new(Mutex::new(Vec::new()));

        let (b, a) = (Arc::clone(&batches), Arc::clone(&auth));
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let (b, a) = (Arc::clone(&b), Arc::clone(&a));
                tokio::spawn(async move {
                    let _ = serve_collector(socket, b, a).await;
                });
            }
        });

        Self { addr, batches, auth }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/ingest", self.addr)
    }

    pub fn health_url(&self) -> String {
        format!("http://{}/health", self.addr)
    }

    pub fn records(&self) -> Vec<Value> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .flat_map(|batch| batch.as_array().cloned().unwrap_or_default())
            .collect()
    }
}

async fn serve_collector(
    socket: TcpStream,
    batches: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(socket);
    loop {
        let mut head = Vec::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await? == 0 {
                return Ok(());
            }
            head.extend_from_slice(line.as_bytes());
            if line == "\r\n" {
                break;
            }
        }

        let mut headers = [httparse::EMPTY_HEADER; 32];
        let mut request = httparse::Request::new(&mut headers);
        if request.parse(&head).is_err() {
            return Ok(());
        }
        let method = request.method.unwrap_or_default().to_string();
        let mut length = 0usize;
        let mut bearer = None;
        for header in request.headers.iter() {
            if header.name.eq_ignore_ascii_case("content-length") {
                length = std::str::from_utf8(header.value).ok().and_then(|v| v.parse().ok()).unwrap_or(0);
            }
            if header.name.eq_ignore_ascii_case("authorization") {
                bearer = Some(String::from_utf8_lossy(header.value).into_owned());
            }
        }

        let mut body = vec![0; length];
        reader.read_exact(&mut body).await?;
        if method == "POST" {
            if let Ok(value) = serde_json::from_slice(&body) {
                batches.lock().unwrap().push(value);
            }
            auth.lock().unwrap().push(bearer);
        }

        reader
            .get_mut()
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n")
            .await?;
    }
}
