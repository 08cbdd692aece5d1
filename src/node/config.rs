//! Node construction configuration
//!
//! Translates a [`Settings`] snapshot into the two records a local node is
//! built from. Both are immutable once built and are consumed only when the
//! node is constructed.

use crate::currency::Currency;
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Core (blockchain storage and RPC) configuration of a local node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoreConfig {
    /// Blockchain data directory
    pub data_dir: PathBuf,
    /// Port the local daemon serves RPC on
    pub rpc_bind_port: u16,
    /// Daemon executable to launch
    pub daemon_path: PathBuf,
}

/// P2P network configuration of a local node
///
/// List options are `None` when the corresponding settings list is empty,
/// which leaves the daemon's own defaults in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetConfig {
    pub p2p_bind_ip: String,
    pub p2p_bind_port: u16,
    pub p2p_external_port: u16,
    pub allow_local_ip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_nodes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_nodes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_nodes: Option<Vec<String>>,
    pub hide_my_port: bool,
    pub testnet: bool,
}

/// Get the directory the wallet keeps its managed daemon in
pub fn managed_node_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("TuringX-Wallet")
            .join("node")
    }

    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("TuringX-Wallet")
            .join("node")
    }

    #[cfg(target_os = "linux")]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".turingx-wallet")
            .join("node")
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        PathBuf::from(".").join("node")
    }
}

/// Build the core configuration from a settings snapshot
pub fn build_core_config(settings: &Settings, currency: &Currency) -> CoreConfig {
    let daemon_path = match &settings.daemon_path {
        Some(path) if !path.is_empty() => PathBuf::from(crate::expand_path(path)),
        _ => managed_node_dir().join(currency.daemon_binary_name()),
    };

    CoreConfig {
        data_dir: settings.get_data_dir(),
        rpc_bind_port: currency.rpc_default_port,
        daemon_path,
    }
}

/// Build the network configuration from a settings snapshot
pub fn build_net_config(settings: &Settings) -> NetConfig {
    NetConfig {
        p2p_bind_ip: settings.p2p_bind_ip.clone(),
        p2p_bind_port: settings.p2p_bind_port,
        p2p_external_port: settings.p2p_external_port,
        allow_local_ip: settings.allow_local_ip,
        peers: non_empty(&settings.peers),
        priority_nodes: non_empty(&settings.priority_nodes),
        exclusive_nodes: non_empty(&settings.exclusive_nodes),
        seed_nodes: non_empty(&settings.seed_nodes),
        hide_my_port: settings.hide_my_port,
        testnet: settings.testnet,
    }
}

fn non_empty(list: &[String]) -> Option<Vec<String>> {
    if list.is_empty() {
        None
    } else {
        Some(list.to_vec())
    }
}

impl CoreConfig {
    /// Daemon command-line arguments for this configuration
    pub fn to_args(&self) -> Vec<String> {
        vec![
            format!("--data-dir={}", self.data_dir.display()),
            "--rpc-bind-ip=127.0.0.1".to_string(),
            format!("--rpc-bind-port={}", self.rpc_bind_port),
        ]
    }
}

impl NetConfig {
    /// Daemon command-line arguments for this configuration
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--p2p-bind-ip={}", self.p2p_bind_ip),
            format!("--p2p-bind-port={}", self.p2p_bind_port),
            format!("--p2p-external-port={}", self.p2p_external_port),
        ];

        if self.allow_local_ip {
            args.push("--allow-local-ip".to_string());
        }

        let lists = [
            ("--add-peer", &self.peers),
            ("--add-priority-node", &self.priority_nodes),
            ("--add-exclusive-node", &self.exclusive_nodes),
            ("--seed-node", &self.seed_nodes),
        ];
        for (flag, list) in lists {
            if let Some(items) = list {
                args.extend(items.iter().map(|item| format!("{}={}", flag, item)));
            }
        }

        if self.hide_my_port {
            args.push("--hide-my-port".to_string());
        }

        if self.testnet {
            args.push("--testnet".to_string());
        }

        args
    }
}
