//! Simple RPC client for the TuringX daemon
//!
//! Used by both node backends to poll chain figures, check daemon readiness
//! and request a graceful shutdown.

use super::error::{NodeError, NodeResult};
use super::state::ChainSnapshot;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use url::Url;

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: serde_json::Value,
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i32,
    message: String,
}

/// Response of the daemon's `/getinfo` endpoint
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GetInfoResponse {
    pub status: String,
    pub height: u64,
    #[serde(default)]
    pub incoming_connections_count: u64,
    #[serde(default)]
    pub outgoing_connections_count: u64,
    #[serde(default)]
    pub last_known_block_index: u64,
}

impl GetInfoResponse {
    pub fn peer_count(&self) -> usize {
        (self.incoming_connections_count + self.outgoing_connections_count) as usize
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BlockHeader {
    pub height: u64,
    pub timestamp: u64,
}

#[derive(Debug, Deserialize)]
struct LastBlockHeaderResult {
    block_header: BlockHeader,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

/// RPC client bound to one daemon endpoint
#[derive(Debug, Clone)]
pub struct NodeRpcClient {
    base: Url,
    client: reqwest::Client,
}

impl NodeRpcClient {
    /// Create a client for `http://{host}:{port}/`
    pub fn new(host: &str, port: u16) -> NodeResult<Self> {
        let base = Url::parse(&format!("http://{}:{}/", host, port))
            .map_err(|e| NodeError::Request(format!("invalid node address {}:{}: {}", host, port, e)))?;

        // The daemon is always reached directly, never through a system proxy
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .no_proxy()
            .build()
            .map_err(|e| NodeError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { base, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> NodeResult<Url> {
        self.base
            .join(path)
            .map_err(|e| NodeError::Request(format!("invalid path {}: {}", path, e)))
    }

    /// Make a JSON-RPC call on `/json_rpc`
    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> NodeResult<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: "0",
            method,
            params,
        };

        let response: RpcResponse<T> = self
            .client
            .post(self.url("json_rpc")?)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(NodeError::Request(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }

        response
            .result
            .ok_or_else(|| NodeError::Request("RPC response missing result".to_string()))
    }

    /// Query `/getinfo`
    pub async fn get_info(&self) -> NodeResult<GetInfoResponse> {
        let info: GetInfoResponse = self
            .client
            .get(self.url("getinfo")?)
            .send()
            .await?
            .json()
            .await?;

        if info.status != "OK" {
            return Err(NodeError::Request(format!("getinfo status {}", info.status)));
        }
        Ok(info)
    }

    /// Header of the daemon's top block
    pub async fn last_block_header(&self) -> NodeResult<BlockHeader> {
        let result: LastBlockHeaderResult = self
            .call("getlastblockheader", serde_json::json!({}))
            .await?;
        Ok(result.block_header)
    }

    /// Collect the chain figures the observers care about
    pub async fn sample(&self) -> NodeResult<ChainSnapshot> {
        let info = self.get_info().await?;
        let header = self.last_block_header().await?;
        Ok(snapshot_from(&info, &header))
    }

    /// Check if the daemon answers RPC
    pub async fn is_ready(&self) -> bool {
        self.get_info().await.is_ok()
    }

    /// Ask the daemon to shut down
    pub async fn stop_daemon(&self) -> NodeResult<()> {
        let response: StatusResponse = self
            .client
            .post(self.url("stop_daemon")?)
            .json(&serde_json::json!({}))
            .send()
            .await?
            .json()
            .await?;

        if response.status != "OK" {
            return Err(NodeError::Request(format!(
                "stop_daemon status {}",
                response.status
            )));
        }
        Ok(())
    }
}

fn snapshot_from(info: &GetInfoResponse, header: &BlockHeader) -> ChainSnapshot {
    ChainSnapshot {
        peer_count: info.peer_count(),
        local_height: info.height,
        known_height: info.last_known_block_index.max(info.height),
        last_block_timestamp: header.timestamp,
    }
}

/// Wait for the daemon to be ready (RPC responding)
pub async fn wait_for_node_ready(client: &NodeRpcClient, timeout: Duration) -> NodeResult<()> {
    let start = Instant::now();

    log::info!(
        "Waiting for node at {} to be ready (timeout: {:?})...",
        client.endpoint(),
        timeout
    );

    loop {
        if client.is_ready().await {
            log::info!("Node is ready (took {:?})", start.elapsed());
            return Ok(());
        }

        if start.elapsed() > timeout {
            return Err(NodeError::Timeout(timeout));
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

/// Gracefully stop the daemon via RPC
pub async fn stop_node_gracefully(client: &NodeRpcClient) -> NodeResult<()> {
    log::info!("Sending RPC stop command...");
    match client.stop_daemon().await {
        Ok(()) => Ok(()),
        Err(NodeError::Network(e)) => {
            // If we can't connect, node might already be stopped
            log::info!("Node appears to already be stopped ({})", e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::mock::{daemon_info, FakeDaemon};
    use serde_json::json;

    #[test]
    fn test_get_info_parsing() {
        let json = r#"{
            "status": "OK",
            "height": 1200,
            "incoming_connections_count": 2,
            "outgoing_connections_count": 6,
            "last_known_block_index": 1500,
            "difficulty": 12345
        }"#;
        let info: GetInfoResponse = serde_json::from_str(json).unwrap();
        assert_eq!(info.peer_count(), 8);
        assert_eq!(info.last_known_block_index, 1500);
    }

    #[test]
    fn test_block_header_parsing() {
        let json = r#"{
            "jsonrpc": "2.0",
            "id": "0",
            "result": {
                "status": "OK",
                "block_header": { "height": 1199, "timestamp": 1650000000, "hash": "ab" }
            }
        }"#;
        let response: RpcResponse<LastBlockHeaderResult> = serde_json::from_str(json).unwrap();
        let header = response.result.unwrap().block_header;
        assert_eq!(header.timestamp, 1_650_000_000);
        assert!(response.error.is_none());
    }

    #[test]
    fn test_rpc_error_parsing() {
        let json = r#"{ "error": { "code": -32601, "message": "Method not found" } }"#;
        let response: RpcResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, -32601);
        assert_eq!(error.message, "Method not found");
    }

    #[test]
    fn test_snapshot_known_height_never_below_local() {
        let info = GetInfoResponse {
            status: "OK".to_string(),
            height: 300,
            incoming_connections_count: 0,
            outgoing_connections_count: 1,
            last_known_block_index: 0,
        };
        let header = BlockHeader {
            height: 299,
            timestamp: 42,
        };
        let snapshot = snapshot_from(&info, &header);
        assert_eq!(snapshot.known_height, 300);
        assert_eq!(snapshot.peer_count, 1);
        assert_eq!(snapshot.last_block_timestamp, 42);
    }

    #[test]
    fn test_client_urls() {
        let client = NodeRpcClient::new("127.0.0.1", 8081).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://127.0.0.1:8081/");
        assert_eq!(client.url("getinfo").unwrap().as_str(), "http://127.0.0.1:8081/getinfo");
    }

    #[tokio::test]
    async fn test_queries_against_running_daemon() {
        let daemon = FakeDaemon::start(
            daemon_info(1200, 6, 1500),
            json!({ "height": 1199, "timestamp": 1650000000, "hash": "ab" }),
        )
        .await;
        let client = NodeRpcClient::new("127.0.0.1", daemon.port()).unwrap();

        let info = client.get_info().await.unwrap();
        assert_eq!(info.height, 1200);
        assert_eq!(info.peer_count(), 6);

        let header = client.last_block_header().await.unwrap();
        assert_eq!(header.height, 1199);
        assert_eq!(header.timestamp, 1_650_000_000);

        let snapshot = client.sample().await.unwrap();
        assert_eq!(
            snapshot,
            ChainSnapshot {
                peer_count: 6,
                local_height: 1200,
                known_height: 1500,
                last_block_timestamp: 1_650_000_000,
            }
        );

        let requests = daemon.requests();
        assert!(requests.iter().any(|r| r.starts_with("GET /getinfo")));
        assert!(requests
            .iter()
            .any(|r| r.starts_with("POST /json_rpc") && r.contains("\"getlastblockheader\"")));
    }

    #[tokio::test]
    async fn test_ready_and_stop_against_running_daemon() {
        let daemon = FakeDaemon::start(daemon_info(1, 0, 1), json!({ "height": 0, "timestamp": 0 })).await;
        let client = NodeRpcClient::new("127.0.0.1", daemon.port()).unwrap();

        wait_for_node_ready(&client, Duration::from_secs(5)).await.unwrap();
        client.stop_daemon().await.unwrap();
        stop_node_gracefully(&client).await.unwrap();
        assert_eq!(
            daemon.requests().iter().filter(|r| r.starts_with("POST /stop_daemon")).count(),
            2
        );
    }

    #[tokio::test]
    async fn test_daemon_reporting_busy_is_not_ready() {
        let mut info = daemon_info(1, 0, 1);
        info["status"] = json!("BUSY");
        let daemon = FakeDaemon::start(info, json!({ "height": 0, "timestamp": 0 })).await;
        let client = NodeRpcClient::new("127.0.0.1", daemon.port()).unwrap();

        assert!(matches!(client.get_info().await, Err(NodeError::Request(_))));
        let err = wait_for_node_ready(&client, Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, NodeError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_network_error() {
        // Port 9 (discard) is closed on test machines
        let client = NodeRpcClient::new("127.0.0.1", 9).unwrap();
        let err = client.get_info().await.unwrap_err();
        assert!(matches!(err, NodeError::Network(_)), "got {:?}", err);
        assert!(!client.is_ready().await);
    }
}
