//! Node access for the TuringX wallet
//!
//! The wallet talks to exactly one node at a time: either a daemon that is
//! already running on the local RPC port (remote mode) or one the wallet
//! starts and owns itself (local mode). [`NodeAdapter`] hides which one is
//! in use and republishes chain updates as [`NodeEvent`]s.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    node module                           │
//! ├─────────────────────────────────────────────────────────┤
//! │  adapter.rs    - Facade, remote probe and local fallback │
//! │  worker.rs     - Local node bring-up on its own thread   │
//! │  handle.rs     - Node/observer/factory traits            │
//! │  factory.rs    - Builds the real node backends           │
//! │  remote.rs     - Node reached over RPC                   │
//! │  local.rs      - Daemon started and owned by the wallet  │
//! │  monitor.rs    - Periodic chain polling                  │
//! │  rpc.rs        - Daemon JSON/JSON-RPC client             │
//! │  config.rs     - Core and network node configuration     │
//! │  state.rs      - Chain snapshots and lifecycle state     │
//! │  payment_id.rs - Payment id parsing and extraction       │
//! │  error.rs      - Error type and numeric codes            │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod factory;
pub mod handle;
pub mod local;
pub mod monitor;
pub mod payment_id;
pub mod remote;
pub mod rpc;
pub mod state;
pub mod worker;

#[cfg(test)]
mod mock;

// Re-export key types for convenience
pub use adapter::{create_node_adapter, NodeAdapter, NodeEvent, SharedNodeAdapter};
pub use config::{build_core_config, build_net_config, CoreConfig, NetConfig};
pub use error::{NodeError, NodeResult};
pub use factory::DaemonNodeFactory;
pub use handle::{NodeFactory, NodeHandle, NodeKind, NodeObserver, WalletHandle};
pub use state::{ChainSnapshot, NodeStatus};
