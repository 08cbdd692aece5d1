//! Node reached over the daemon's RPC interface

use super::handle::{InitCallback, NodeHandle, NodeKind, NodeObserver, WalletHandle};
use super::error::NodeResult;
use super::monitor::run_monitor;
use super::payment_id;
use super::rpc::NodeRpcClient;
use super::state::ChainState;
use crate::currency::Currency;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Node backed by a daemon somebody else runs
pub struct RemoteNode {
    currency: Currency,
    rpc: NodeRpcClient,
    observer: Arc<dyn NodeObserver>,
    chain: Arc<ChainState>,
    /// Polling task (if initialized)
    task: Option<JoinHandle<()>>,
}

impl RemoteNode {
    pub fn new(
        currency: Currency,
        host: &str,
        port: u16,
        observer: Arc<dyn NodeObserver>,
    ) -> NodeResult<Self> {
        Ok(Self {
            currency,
            rpc: NodeRpcClient::new(host, port)?,
            observer,
            chain: Arc::new(ChainState::new()),
            task: None,
        })
    }

    fn assert_initialized(&self) {
        assert!(self.task.is_some(), "remote node used while not initialized");
    }
}

impl NodeHandle for RemoteNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Remote
    }

    fn init(&mut self, on_complete: InitCallback) {
        log::info!("Connecting to remote node at {}", self.rpc.endpoint());
        let task = tokio::spawn(run_monitor(
            self.rpc.clone(),
            self.chain.clone(),
            self.observer.clone(),
            Some(on_complete),
        ));
        if let Some(previous) = self.task.replace(task) {
            log::warn!("Remote node initialized twice, dropping the older poller");
            previous.abort();
        }
    }

    fn deinit(&mut self) {
        match self.task.take() {
            Some(task) => {
                task.abort();
                self.chain.reset();
                log::info!("Disconnected from remote node at {}", self.rpc.endpoint());
            }
            None => log::warn!("Remote node deinitialized while not initialized"),
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
        WalletHandle::new(NodeKind::Remote, self.currency.clone(), self.chain.clone())
    }
}

impl Drop for RemoteNode {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
