//! The node capability shared by every backend
//!
//! A node is either reached over RPC ([`RemoteNode`](super::remote::RemoteNode))
//! or run by the wallet itself ([`LocalNode`](super::local::LocalNode)). The
//! adapter only ever talks to the traits in this module.

use super::config::{CoreConfig, NetConfig};
use super::error::{NodeError, NodeResult};
use super::state::ChainState;
use crate::currency::Currency;
use crate::logging::LoggerManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Completion callback for [`NodeHandle::init`], invoked exactly once
pub type InitCallback = Box<dyn FnOnce(Result<(), NodeError>) + Send + 'static>;

/// Which backend a node handle is
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Remote,
    Local,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Remote => "remote",
            NodeKind::Local => "local",
        }
    }
}

/// Receives chain updates from a node
///
/// Called from whatever task polls the node, so implementations must be
/// cheap and must not block.
pub trait NodeObserver: Send + Sync {
    fn peer_count_updated(&self, _count: usize) {}
    fn local_blockchain_updated(&self, _height: u64) {}
    fn last_known_block_height_updated(&self, _height: u64) {}
}

/// A connection to a node, whichever way it is reached
pub trait NodeHandle: Send + Sync {
    fn kind(&self) -> NodeKind;

    /// Start bringing the node up. Must be called from within a tokio
    /// runtime; `on_complete` runs once the node answers or fails to.
    fn init(&mut self, on_complete: InitCallback);

    /// Stop the node. Only valid after `init`.
    fn deinit(&mut self);

    /// Connected peers. Panics unless initialized.
    fn peer_count(&self) -> usize;
    /// Height of the best block the network knows about. Panics unless initialized.
    fn last_known_block_height(&self) -> u64;
    /// Height of the node's own chain. Panics unless initialized.
    fn last_local_block_height(&self) -> u64;
    /// Unix timestamp of the node's top block. Panics unless initialized.
    fn last_local_block_timestamp(&self) -> u64;

    fn convert_payment_id(&self, text: &str) -> NodeResult<Vec<u8>>;
    fn extract_payment_id(&self, extra: &[u8]) -> String;

    /// Create a wallet bound to this node
    fn create_wallet(&self) -> WalletHandle;
}

/// Constructs node backends; the boundary to the node implementation
pub trait NodeFactory: Send + Sync {
    fn create_remote(
        &self,
        currency: &Currency,
        host: &str,
        port: u16,
        observer: Arc<dyn NodeObserver>,
    ) -> NodeResult<Box<dyn NodeHandle>>;

    fn create_local(
        &self,
        currency: &Currency,
        logger: &LoggerManager,
        core_config: &CoreConfig,
        net_config: &NetConfig,
        observer: Arc<dyn NodeObserver>,
    ) -> NodeResult<Box<dyn NodeHandle>>;
}

/// Wallet object bound to the node that created it
#[derive(Debug, Clone)]
pub struct WalletHandle {
    kind: NodeKind,
    currency: Currency,
    chain: Arc<ChainState>,
}

impl WalletHandle {
    pub fn new(kind: NodeKind, currency: Currency, chain: Arc<ChainState>) -> Self {
        Self {
            kind,
            currency,
            chain,
        }
    }

    pub fn node_kind(&self) -> NodeKind {
        self.kind
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Height the wallet can be synchronized up to
    pub fn sync_height(&self) -> u64 {
        self.chain.snapshot().local_height
    }

    /// Synchronization progress in 0.0 - 1.0
    pub fn sync_progress(&self) -> f32 {
        self.chain.snapshot().sync_progress()
    }

    pub fn is_synchronized(&self) -> bool {
        let snapshot = self.chain.snapshot();
        snapshot.known_height > 0 && snapshot.local_height >= snapshot.known_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::state::ChainSnapshot;

    struct Silent;
    impl NodeObserver for Silent {}

    #[test]
    fn test_wallet_follows_chain() {
        let chain = Arc::new(ChainState::new());
        let wallet = WalletHandle::new(NodeKind::Remote, Currency::turingx(), chain.clone());
        assert!(!wallet.is_synchronized());

        chain.apply(
            ChainSnapshot {
                peer_count: 4,
                local_height: 50,
                known_height: 100,
                last_block_timestamp: 0,
            },
            &Silent,
        );
        assert_eq!(wallet.sync_height(), 50);
        assert!((wallet.sync_progress() - 0.5).abs() < f32::EPSILON);

        chain.apply(
            ChainSnapshot {
                peer_count: 4,
                local_height: 100,
                known_height: 100,
                last_block_timestamp: 0,
            },
            &Silent,
        );
        assert!(wallet.is_synchronized());
        assert_eq!(wallet.node_kind(), NodeKind::Remote);
    }

    #[test]
    fn test_kind_serialization() {
        assert_eq!(serde_json::to_string(&NodeKind::Local).unwrap(), "\"local\"");
        assert_eq!(NodeKind::Remote.as_str(), "remote");
    }
}
