//! Scriptable node backends and a canned daemon for tests

use super::config::{CoreConfig, NetConfig};
use super::error::{NodeError, NodeResult};
use super::handle::{InitCallback, NodeFactory, NodeHandle, NodeKind, NodeObserver, WalletHandle};
use super::payment_id;
use super::state::{ChainSnapshot, ChainState};
use crate::currency::Currency;
use crate::logging::LoggerManager;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// What a mock node does when initialized
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Report `snapshot` after `delay`, then complete init successfully
    Live {
        delay: Duration,
        snapshot: ChainSnapshot,
    },
    /// Report nothing; init completes late with a network error
    Silent,
    /// Complete init with `NodeError::Network`
    FailWith(String),
    /// Panic inside `init` itself
    PanicOnInit,
    /// Panic inside the init task, dropping the callback
    PanicInTask,
}

#[derive(Debug, Default)]
pub struct Counters {
    pub remote_created: AtomicUsize,
    pub local_created: AtomicUsize,
    pub deinit_calls: AtomicUsize,
    pub dropped: AtomicUsize,
    /// Host and port of the last remote node created
    pub remote_endpoint: Mutex<Option<(String, u16)>>,
}

pub struct MockNode {
    kind: NodeKind,
    behavior: Behavior,
    observer: Arc<dyn NodeObserver>,
    chain: Arc<ChainState>,
    counters: Arc<Counters>,
    task: Option<JoinHandle<()>>,
    initialized: bool,
}

impl MockNode {
    fn assert_initialized(&self) {
        assert!(self.initialized, "mock node used while not initialized");
    }
}

impl NodeHandle for MockNode {
    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn init(&mut self, on_complete: InitCallback) {
        self.initialized = true;
        let chain = self.chain.clone();
        let observer = self.observer.clone();

        let task = match self.behavior.clone() {
            Behavior::Live { delay, snapshot } => tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                chain.apply(snapshot, observer.as_ref());
                on_complete(Ok(()));
            }),
            Behavior::Silent => tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                on_complete(Err(NodeError::Network("connection refused".to_string())));
            }),
            Behavior::FailWith(message) => tokio::spawn(async move {
                on_complete(Err(NodeError::Network(message)));
            }),
            Behavior::PanicOnInit => panic!("mock node exploded during init"),
            Behavior::PanicInTask => tokio::spawn(async move {
                let _callback = on_complete;
                panic!("mock node task exploded");
            }),
        };
        self.task = Some(task);
    }

    fn deinit(&mut self) {
        self.counters.deinit_calls.fetch_add(1, Ordering::SeqCst);
        self.initialized = false;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn peer_count(&self) -> usize {
        self.assert_initialized();
        self.chain.snapshot().peer_count
    }

    fn last_known_block_height(&self) -> u64 {
        self.assert_initialized();
        self.chain.snapshot().known_height
    }

    fn last_local_block_height(&self) -> u64 {
        self.assert_initialized();
        self.chain.snapshot().local_height
    }

    fn last_local_block_timestamp(&self) -> u64 {
        self.assert_initialized();
        self.chain.snapshot().last_block_timestamp
    }

    fn convert_payment_id(&self, text: &str) -> NodeResult<Vec<u8>> {
        payment_id::parse_payment_id(text)
    }

    fn extract_payment_id(&self, extra: &[u8]) -> String {
        payment_id::extract_payment_id(extra)
    }

    fn create_wallet(&self) -> WalletHandle {
        WalletHandle::new(self.kind, Currency::turingx(), self.chain.clone())
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockFactory {
    remote: Behavior,
    local: Behavior,
    counters: Arc<Counters>,
}

impl MockFactory {
    pub fn new(remote: Behavior, local: Behavior) -> Self {
        Self {
            remote,
            local,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }

    fn node(&self, kind: NodeKind, behavior: &Behavior, observer: Arc<dyn NodeObserver>) -> Box<dyn NodeHandle> {
        Box::new(MockNode {
            kind,
            behavior: behavior.clone(),
            observer,
            chain: Arc::new(ChainState::new()),
            counters: self.counters.clone(),
            task: None,
            initialized: false,
        })
    }
}

impl NodeFactory for MockFactory {
    fn create_remote(
        &self,
        _currency: &Currency,
        host: &str,
        port: u16,
        observer: Arc<dyn NodeObserver>,
    ) -> NodeResult<Box<dyn NodeHandle>> {
        self.counters.remote_created.fetch_add(1, Ordering::SeqCst);
        *self.counters.remote_endpoint.lock().unwrap() = Some((host.to_string(), port));
        Ok(self.node(NodeKind::Remote, &self.remote, observer))
    }

    fn create_local(
        &self,
        _currency: &Currency,
        _logger: &LoggerManager,
        _core_config: &CoreConfig,
        _net_config: &NetConfig,
        observer: Arc<dyn NodeObserver>,
    ) -> NodeResult<Box<dyn NodeHandle>> {
        self.counters.local_created.fetch_add(1, Ordering::SeqCst);
        Ok(self.node(NodeKind::Local, &self.local, observer))
    }
}

/// Observer that records every call in order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    calls: Mutex<Vec<(&'static str, u64)>>,
}

impl RecordingObserver {
    pub fn calls(&self) -> Vec<(&'static str, u64)> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until `call` has been recorded, giving up after five seconds
    pub async fn wait_for(&self, call: (&'static str, u64)) -> bool {
        for _ in 0..100 {
            if self.calls().contains(&call) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    fn record(&self, name: &'static str, value: u64) {
        self.calls.lock().unwrap().push((name, value));
    }
}

impl NodeObserver for RecordingObserver {
    fn peer_count_updated(&self, count: usize) {
        self.record("peers", count as u64);
    }

    fn local_blockchain_updated(&self, height: u64) {
        self.record("local", height);
    }

    fn last_known_block_height_updated(&self, height: u64) {
        self.record("known", height);
    }
}

/// `/getinfo` body of a healthy daemon
pub fn daemon_info(height: u64, peers: u64, known: u64) -> Value {
    json!({
        "status": "OK",
        "height": height,
        "incoming_connections_count": 0,
        "outgoing_connections_count": peers,
        "last_known_block_index": known,
    })
}

/// Daemon on an ephemeral port answering `/getinfo`, `/json_rpc` and
/// `/stop_daemon` with canned replies
pub struct FakeDaemon {
    port: u16,
    info: Arc<Mutex<Value>>,
    requests: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl FakeDaemon {
    pub async fn start(info: Value, block_header: Value) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let info = Arc::new(Mutex::new(info));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let task = {
            let info = info.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let info = info.clone();
                    let requests = requests.clone();
                    let header = block_header.clone();
                    tokio::spawn(async move {
                        let _ = serve(stream, &info, &header, &requests).await;
                    });
                }
            })
        };

        Self {
            port,
            info,
            requests,
            task,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Replace the `/getinfo` reply
    pub fn set_info(&self, info: Value) {
        *self.info.lock().unwrap() = info;
    }

    /// Requests seen so far, as `METHOD PATH BODY`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    info: &Mutex<Value>,
    block_header: &Value,
    requests: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < head_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[head_end..]).to_string();

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    requests
        .lock()
        .unwrap()
        .push(format!("{} {} {}", method, path, body).trim_end().to_string());

    let (status, reply) = match (method.as_str(), path.as_str()) {
        ("GET", "/getinfo") => ("200 OK", info.lock().unwrap().clone()),
        ("POST", "/json_rpc") => (
            "200 OK",
            json!({
                "jsonrpc": "2.0",
                "id": "0",
                "result": { "status": "OK", "block_header": block_header },
            }),
        ),
        ("POST", "/stop_daemon") => ("200 OK", json!({ "status": "OK" })),
        _ => ("404 Not Found", json!({})),
    };

    let reply = reply.to_string();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reply.len(),
        reply
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
