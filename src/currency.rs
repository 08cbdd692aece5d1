//! Currency parameters shared by the node factory and wallets

use serde::{Deserialize, Serialize};

/// Default RPC port of the TuringX daemon
pub const RPC_DEFAULT_PORT: u16 = 8081;

/// Default P2P port of the TuringX daemon
pub const P2P_DEFAULT_PORT: u16 = 8080;

/// Currency description handed to every node the wallet creates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    /// Human readable name
    pub name: String,
    /// RPC port a daemon listens on unless configured otherwise
    pub rpc_default_port: u16,
    /// P2P port a daemon listens on unless configured otherwise
    pub p2p_default_port: u16,
    /// File name of the daemon executable (without platform suffix)
    pub daemon_name: String,
}

impl Currency {
    /// The TuringX main currency
    pub fn turingx() -> Self {
        Self {
            name: "TuringX".to_string(),
            rpc_default_port: RPC_DEFAULT_PORT,
            p2p_default_port: P2P_DEFAULT_PORT,
            daemon_name: "turingxd".to_string(),
        }
    }

    /// Daemon executable name for the current platform
    pub fn daemon_binary_name(&self) -> String {
        #[cfg(target_os = "windows")]
        {
            format!("{}.exe", self.daemon_name)
        }

        #[cfg(not(target_os = "windows"))]
        {
            self.daemon_name.clone()
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::turingx()
    }
}
