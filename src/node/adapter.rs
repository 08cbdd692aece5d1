//! Node adapter facade
//!
//! The one component the wallet UI talks to. On `init` it first looks for a
//! node already answering on the local RPC port; if none shows signs of
//! life within [`REMOTE_PROBE_TIMEOUT`], it has the lifecycle worker start a
//! wallet-managed node instead. Node events are republished as
//! [`NodeEvent`]s on a broadcast channel, in the order they happen.
//!
//! ```text
//! Uninitialized ──init──► ProbingRemote ──event──► Ready
//!                              │
//!                           timeout
//!                              ▼
//!                      InitializingLocal ──ok──► Ready ──deinit──► Deinitialized
//!                              │
//!                             err
//!                              ▼
//!                          FailedInit
//! ```

use super::config::{build_core_config, build_net_config};
use super::error::NodeError;
use super::handle::{NodeFactory, NodeHandle, NodeKind, NodeObserver, WalletHandle};
use super::state::{ChainSnapshot, LifecycleState, NodeStatus};
use super::worker::{LocalNodeRequest, NodeLifecycleWorker};
use crate::currency::Currency;
use crate::logging::LoggerManager;
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Mutex;

/// Host probed for an already running node
pub const REMOTE_NODE_HOST: &str = "127.0.0.1";

/// How long the remote node gets to report anything
pub const REMOTE_PROBE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Notification channel capacity
const EVENT_CHANNEL_SIZE: usize = 256;

/// Notifications published by the adapter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum NodeEvent {
    InitCompleted,
    InitFailed { code: i32 },
    DeinitCompleted,
    PeerCountChanged { count: usize },
    LocalHeightChanged { height: u64 },
    KnownHeightChanged { height: u64 },
}

/// Forwards node callbacks onto the adapter's notification channel
struct EventRelay {
    events: broadcast::Sender<NodeEvent>,
}

impl EventRelay {
    fn publish(&self, event: NodeEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl NodeObserver for EventRelay {
    fn peer_count_updated(&self, count: usize) {
        self.publish(NodeEvent::PeerCountChanged { count });
    }

    fn local_blockchain_updated(&self, height: u64) {
        self.publish(NodeEvent::LocalHeightChanged { height });
    }

    fn last_known_block_height_updated(&self, height: u64) {
        self.publish(NodeEvent::KnownHeightChanged { height });
    }
}

/// Facade over whichever node backend is active
pub struct NodeAdapter {
    settings: Settings,
    currency: Currency,
    logger: Arc<LoggerManager>,
    factory: Arc<dyn NodeFactory>,
    relay: Arc<EventRelay>,
    node: Option<Box<dyn NodeHandle>>,
    worker: Option<NodeLifecycleWorker>,
    state: LifecycleState,
    probe_timeout: Duration,
    remote_port: u16,
}

impl NodeAdapter {
    pub fn new(
        settings: Settings,
        currency: Currency,
        logger: Arc<LoggerManager>,
        factory: Arc<dyn NodeFactory>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let remote_port = currency.rpc_default_port;

        Self {
            settings,
            currency,
            logger,
            factory,
            relay: Arc::new(EventRelay { events }),
            node: None,
            worker: None,
            state: LifecycleState::Uninitialized,
            probe_timeout: REMOTE_PROBE_TIMEOUT,
            remote_port,
        }
    }

    /// Override the remote probe window
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Subscribe to adapter notifications
    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.relay.events.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }

    pub(crate) fn state(&self) -> LifecycleState {
        self.state
    }

    /// Backend in use, if any
    pub fn active_kind(&self) -> Option<NodeKind> {
        self.node.as_ref().map(|node| node.kind())
    }

    fn set_state(&mut self, state: LifecycleState) {
        log::debug!("Node adapter: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn active(&self) -> &dyn NodeHandle {
        match self.node.as_deref() {
            Some(node) => node,
            None => panic!("node adapter used without an active node"),
        }
    }

    /// Connect to a node, publishing exactly one of `InitCompleted` or
    /// `InitFailed`
    ///
    /// # Panics
    /// If a node is already active.
    pub async fn init(&mut self) -> Result<NodeKind, NodeError> {
        assert!(self.node.is_none(), "node adapter initialized twice");

        let kind = if self.probe_remote().await {
            NodeKind::Remote
        } else {
            match self.init_local().await {
                Ok(()) => NodeKind::Local,
                Err(e) => {
                    log::error!("Node initialization failed: {} (code {})", e, e.code());
                    self.set_state(LifecycleState::FailedInit);
                    self.relay.publish(NodeEvent::InitFailed { code: e.code() });
                    return Err(e);
                }
            }
        };

        self.set_state(LifecycleState::Ready);
        log::info!("Node adapter ready ({} node)", kind.as_str());
        self.relay.publish(NodeEvent::InitCompleted);

        // Subscribers get current heights without waiting for the next change
        let node = self.active();
        let local_height = node.last_local_block_height();
        let known_height = node.last_known_block_height();
        self.relay.publish(NodeEvent::LocalHeightChanged { height: local_height });
        self.relay.publish(NodeEvent::KnownHeightChanged { height: known_height });

        Ok(kind)
    }

    /// Wait for a node on the local RPC port to report anything
    async fn probe_remote(&mut self) -> bool {
        self.set_state(LifecycleState::ProbingRemote);

        // Subscribe before init so no early event is missed
        let mut events = self.subscribe();
        let mut node = match self.factory.create_remote(
            &self.currency,
            REMOTE_NODE_HOST,
            self.remote_port,
            self.relay.clone(),
        ) {
            Ok(node) => node,
            Err(e) => {
                log::warn!("Could not create remote node: {}", e);
                return false;
            }
        };

        log::info!(
            "Probing for a node at {}:{} ({:?})",
            REMOTE_NODE_HOST,
            self.remote_port,
            self.probe_timeout
        );
        node.init(Box::new(|result| {
            // Only liveness events decide the probe; this may also arrive
            // after the node was discarded
            if let Err(e) = result {
                log::debug!("Remote node init reported: {}", e);
            }
        }));

        let alive = tokio::time::timeout(self.probe_timeout, async {
            loop {
                match events.recv().await {
                    Ok(NodeEvent::PeerCountChanged { .. }) | Ok(NodeEvent::LocalHeightChanged { .. }) => {
                        return true;
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return false,
                }
            }
        })
        .await
        .unwrap_or(false);

        if alive {
            log::info!("Using remote node at {}:{}", REMOTE_NODE_HOST, self.remote_port);
            self.node = Some(node);
        } else {
            log::info!("No remote node answered, falling back to a local node");
            drop(node);
        }
        alive
    }

    /// Have the worker build and initialize a local node
    async fn init_local(&mut self) -> Result<(), NodeError> {
        debug_assert!(self.node.is_none());
        self.set_state(LifecycleState::InitializingLocal);

        if self.worker.is_none() {
            self.worker = Some(NodeLifecycleWorker::spawn(self.factory.clone())?);
        }
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| NodeError::Internal("node worker missing".to_string()))?;

        let request = LocalNodeRequest {
            currency: self.currency.clone(),
            logger: self.logger.clone(),
            core_config: build_core_config(&self.settings, &self.currency),
            net_config: build_net_config(&self.settings),
            observer: self.relay.clone(),
        };

        let node = worker.start(request).await?;
        self.node = Some(node);
        Ok(())
    }

    /// Tear down the active node, if any
    ///
    /// Publishes `DeinitCompleted` when a node was torn down and nothing
    /// otherwise; calling it again is harmless.
    pub async fn deinit(&mut self) {
        let Some(mut node) = self.node.take() else {
            return;
        };

        self.set_state(LifecycleState::Deinitializing);
        match node.kind() {
            NodeKind::Local => {
                let stopped = match self.worker.as_ref() {
                    Some(worker) => worker.stop(node).await,
                    None => Err(NodeError::Internal("local node without a worker".to_string())),
                };
                if let Err(e) = stopped {
                    log::error!("Failed to stop local node cleanly: {}", e);
                }
                if let Some(worker) = self.worker.take() {
                    worker.shutdown();
                }
            }
            NodeKind::Remote => {
                node.deinit();
                drop(node);
            }
        }

        self.set_state(LifecycleState::Deinitialized);
        log::info!("Node adapter deinitialized");
        self.relay.publish(NodeEvent::DeinitCompleted);
    }

    pub fn peer_count(&self) -> usize {
        self.active().peer_count()
    }

    pub fn last_known_block_height(&self) -> u64 {
        self.active().last_known_block_height()
    }

    pub fn last_local_block_height(&self) -> u64 {
        self.active().last_local_block_height()
    }

    pub fn last_local_block_timestamp(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.active().last_local_block_timestamp())
    }

    /// Parse a user-entered payment id; empty when malformed
    pub fn convert_payment_id(&self, text: &str) -> Vec<u8> {
        match self.active().convert_payment_id(text) {
            Ok(id) => id,
            Err(e) => {
                log::debug!("Ignoring payment id {:?}: {}", text, e);
                Vec::new()
            }
        }
    }

    /// Payment id carried in a transaction's extra, as hex (or empty)
    pub fn extract_payment_id(&self, extra: &[u8]) -> String {
        self.active().extract_payment_id(extra)
    }

    pub fn create_wallet(&self) -> WalletHandle {
        self.active().create_wallet()
    }

    /// Snapshot for display; all zero while no node is active
    pub fn status(&self) -> NodeStatus {
        let Some(node) = self.node.as_deref() else {
            return NodeStatus::default();
        };

        let snapshot = ChainSnapshot {
            peer_count: node.peer_count(),
            local_height: node.last_local_block_height(),
            known_height: node.last_known_block_height(),
            last_block_timestamp: node.last_local_block_timestamp(),
        };

        NodeStatus {
            kind: Some(node.kind()),
            ready: self.is_ready(),
            peers: snapshot.peer_count,
            local_height: snapshot.local_height,
            known_height: snapshot.known_height,
            last_block_timestamp: snapshot.last_block_timestamp,
            sync_progress: snapshot.sync_progress(),
        }
    }
}

/// Type alias for a node adapter shared between tasks
pub type SharedNodeAdapter = Arc<Mutex<NodeAdapter>>;

/// Create a shared node adapter backed by `factory`
pub fn create_node_adapter(
    settings: Settings,
    currency: Currency,
    logger: Arc<LoggerManager>,
    factory: Arc<dyn NodeFactory>,
) -> SharedNodeAdapter {
    Arc::new(Mutex::new(NodeAdapter::new(settings, currency, logger, factory)))
}
