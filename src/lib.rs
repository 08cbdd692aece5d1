//! TuringX Wallet core
//!
//! Everything the desktop wallet needs below its UI to reach a node:
//! persisted settings, logging, and the [`node`] adapter that picks a
//! running daemon or starts one of its own.

use std::path::PathBuf;

pub mod currency;
pub mod logging;
pub mod node;
pub mod settings;

pub use currency::Currency;
pub use logging::LoggerManager;
pub use node::{DaemonNodeFactory, NodeAdapter, NodeEvent, NodeKind};
pub use settings::Settings;

/// Directory holding the wallet's own files (settings)
pub fn app_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("TuringX-Wallet")
}

/// Directory the wallet and the managed daemon log into
pub fn app_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("TuringX-Wallet")
        .join("logs")
}

/// Expand environment variables and ~ in paths
/// Windows: %VAR% style
/// Unix: ~ expands to HOME
pub(crate) fn expand_path(path: &str) -> String {
    let mut result = path.to_string();

    #[cfg(windows)]
    {
        // Expand %VAR% style environment variables on Windows
        while let Some(start) = result.find('%') {
            if let Some(end) = result[start + 1..].find('%') {
                let var_name = &result[start + 1..start + 1 + end];
                if let Ok(value) = std::env::var(var_name) {
                    result = format!("{}{}{}", &result[..start], value, &result[start + 2 + end..]);
                } else {
                    break;
                }
            } else {
                break;
            }
        }
    }

    #[cfg(not(windows))]
    {
        if result.starts_with("~/") {
            if let Some(home) = dirs::home_dir() {
                result = format!("{}{}", home.display(), &result[1..]);
            }
        } else if result == "~" {
            if let Some(home) = dirs::home_dir() {
                result = home.to_string_lossy().to_string();
            }
        }
    }

    result
}
