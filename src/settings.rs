//! Wallet settings and persistence
//!
//! Handles loading and saving the settings the node adapter reads from disk.
//! The adapter and the config builder only ever read a snapshot.

use crate::currency::P2P_DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings stored in settings.json
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Blockchain data directory (empty means platform default)
    #[serde(default)]
    pub data_dir: String,

    /// Address the local node binds its P2P listener to
    #[serde(default = "default_p2p_bind_ip")]
    pub p2p_bind_ip: String,

    /// Port the local node binds its P2P listener to
    #[serde(default = "default_p2p_bind_port")]
    pub p2p_bind_port: u16,

    /// Port advertised to peers (0 means same as bind port)
    #[serde(default)]
    pub p2p_external_port: u16,

    /// Accept peers on local network addresses
    #[serde(default)]
    pub allow_local_ip: bool,

    /// Do not announce our port to other peers
    #[serde(default)]
    pub hide_my_port: bool,

    /// Additional peers to connect to
    #[serde(default)]
    pub peers: Vec<String>,

    /// Peers the node always tries to keep connected
    #[serde(default)]
    pub priority_nodes: Vec<String>,

    /// Connect only to these peers
    #[serde(default)]
    pub exclusive_nodes: Vec<String>,

    /// Seed nodes used for initial peer discovery
    #[serde(default)]
    pub seed_nodes: Vec<String>,

    /// Run against the test network
    #[serde(default)]
    pub testnet: bool,

    /// Custom path to the daemon binary for the local node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daemon_path: Option<String>,
}

fn default_p2p_bind_ip() -> String {
    "0.0.0.0".to_string()
}

fn default_p2p_bind_port() -> u16 {
    P2P_DEFAULT_PORT
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            p2p_bind_ip: default_p2p_bind_ip(),
            p2p_bind_port: default_p2p_bind_port(),
            p2p_external_port: 0,
            allow_local_ip: false,
            hide_my_port: false,
            peers: Vec::new(),
            priority_nodes: Vec::new(),
            exclusive_nodes: Vec::new(),
            seed_nodes: Vec::new(),
            testnet: false,
            daemon_path: None,
        }
    }
}

impl Settings {
    /// Get the path to the settings file
    pub fn settings_path() -> PathBuf {
        crate::app_config_dir().join("settings.json")
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        Self::load_from(&Self::settings_path())
    }

    /// Load settings from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable settings at {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::settings_path())
    }

    /// Save settings to a specific file
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings dir: {}", e))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(path, contents).map_err(|e| format!("Failed to write settings: {}", e))?;

        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Get the default blockchain data directory
    pub fn default_data_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("TuringX")
        }

        #[cfg(target_os = "macos")]
        {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("TuringX")
        }

        #[cfg(target_os = "linux")]
        {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".turingx")
        }

        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            PathBuf::from(".").join("turingx")
        }
    }

    /// Absolute data directory (configured or default)
    pub fn get_data_dir(&self) -> PathBuf {
        if self.data_dir.is_empty() {
            return Self::default_data_dir();
        }

        let expanded = PathBuf::from(crate::expand_path(&self.data_dir));
        if expanded.is_absolute() {
            expanded
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&expanded))
                .unwrap_or(expanded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.p2p_bind_ip, "0.0.0.0");
        assert_eq!(settings.p2p_bind_port, P2P_DEFAULT_PORT);
        assert!(settings.seed_nodes.is_empty());
        assert!(!settings.testnet);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.testnet = true;
        settings.seed_nodes = vec!["a:1".to_string(), "b:2".to_string()];
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "peers": ["10.0.0.1:8080"] }"#).unwrap();

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.peers, vec!["10.0.0.1:8080".to_string()]);
        assert_eq!(loaded.p2p_bind_port, P2P_DEFAULT_PORT);
    }

    #[test]
    fn test_absolute_data_dir_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_dir: dir.path().to_string_lossy().to_string(),
            ..Default::default()
        };
        assert_eq!(settings.get_data_dir(), dir.path());
    }
}
