//! Node error type and the numeric codes reported to observers

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Numeric codes carried by `NodeEvent::InitFailed`
pub mod codes {
    pub const NETWORK_ERROR: i32 = 3;
    /// Reported when node bring-up fails for a reason without its own code
    pub const INTERNAL_WALLET_ERROR: i32 = 5;
    pub const REQUEST_ERROR: i32 = 6;
    pub const DAEMON_NOT_FOUND: i32 = 7;
    pub const IO_ERROR: i32 = 8;
    pub const TIMEOUT: i32 = 9;
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request error: {0}")]
    Request(String),
    #[error("invalid payment id: {0}")]
    InvalidPaymentId(String),
    #[error("daemon binary not found at {}", .0.display())]
    DaemonNotFound(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("node did not become ready within {0:?}")]
    Timeout(Duration),
    #[error("internal error: {0}")]
    Internal(String),
}

impl NodeError {
    pub fn code(&self) -> i32 {
        match self {
            NodeError::Network(_) => codes::NETWORK_ERROR,
            NodeError::Request(_) | NodeError::InvalidPaymentId(_) => codes::REQUEST_ERROR,
            NodeError::DaemonNotFound(_) => codes::DAEMON_NOT_FOUND,
            NodeError::Io(_) => codes::IO_ERROR,
            NodeError::Timeout(_) => codes::TIMEOUT,
            NodeError::Internal(_) => codes::INTERNAL_WALLET_ERROR,
        }
    }
}

impl From<reqwest::Error> for NodeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            NodeError::Network(err.to_string())
        } else {
            NodeError::Request(err.to_string())
        }
    }
}

pub type NodeResult<T> = Result<T, NodeError>;
