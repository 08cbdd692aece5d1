//! Shared state for node backends and the adapter
//!
//! Tracks the last chain figures each node reported and the adapter's
//! lifecycle position.

use super::handle::{NodeKind, NodeObserver};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Chain figures reported by a node at one point in time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChainSnapshot {
    /// Number of connected peers
    pub peer_count: usize,
    /// Height of the node's own chain
    pub local_height: u64,
    /// Best height known to the network
    pub known_height: u64,
    /// Unix timestamp of the top local block
    pub last_block_timestamp: u64,
}

impl ChainSnapshot {
    /// Sync progress (0.0 - 1.0)
    pub fn sync_progress(&self) -> f32 {
        if self.known_height == 0 {
            return 0.0;
        }
        (self.local_height as f64 / self.known_height as f64).min(1.0) as f32
    }
}

/// Last snapshot a node reported, diffed against each new poll
#[derive(Debug, Default)]
pub struct ChainState {
    last: Mutex<Option<ChainSnapshot>>,
}

impl ChainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the latest snapshot (all zero before the first poll)
    pub fn snapshot(&self) -> ChainSnapshot {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .unwrap_or_default()
    }

    /// Whether any poll has succeeded yet
    pub fn has_snapshot(&self) -> bool {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Store a new snapshot and tell the observer what changed
    ///
    /// The first snapshot counts as a change for every figure. Observer
    /// calls happen after the lock is released, in the order peer count,
    /// local height, known height.
    pub fn apply(&self, next: ChainSnapshot, observer: &dyn NodeObserver) {
        let previous = {
            let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            last.replace(next)
        };

        let changed = |f: fn(&ChainSnapshot) -> u64| match previous {
            Some(prev) => f(&prev) != f(&next),
            None => true,
        };

        if changed(|s| s.peer_count as u64) {
            observer.peer_count_updated(next.peer_count);
        }
        if changed(|s| s.local_height) {
            observer.local_blockchain_updated(next.local_height);
        }
        if changed(|s| s.known_height) {
            observer.last_known_block_height_updated(next.known_height);
        }
    }

    /// Forget the last snapshot (node went away)
    pub fn reset(&self) {
        *self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

/// Lifecycle of the node adapter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    ProbingRemote,
    InitializingLocal,
    Ready,
    FailedInit,
    Deinitializing,
    Deinitialized,
}

/// Current status of the node adapter (for display)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    /// Backend in use, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,

    /// Whether the adapter has an initialized node
    pub ready: bool,

    /// Number of connected peers
    pub peers: usize,

    /// Local chain height
    pub local_height: u64,

    /// Best height known to the network
    pub known_height: u64,

    /// Unix timestamp of the top local block
    pub last_block_timestamp: u64,

    /// Sync progress (0.0 - 1.0)
    pub sync_progress: f32,
}
