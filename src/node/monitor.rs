//! Periodic chain polling shared by both node backends

use super::handle::{InitCallback, NodeObserver};
use super::rpc::NodeRpcClient;
use super::state::ChainState;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Polling interval for chain figures
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll `rpc` forever, pushing changes into `chain` and the observer
///
/// When `on_first` is given it is resolved by the outcome of the first
/// poll. Polling continues after a failed first poll so a daemon that
/// comes up late is still picked up.
pub async fn run_monitor(
    rpc: NodeRpcClient,
    chain: Arc<ChainState>,
    observer: Arc<dyn NodeObserver>,
    mut on_first: Option<InitCallback>,
) {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        match rpc.sample().await {
            Ok(snapshot) => {
                chain.apply(snapshot, observer.as_ref());
                if let Some(callback) = on_first.take() {
                    callback(Ok(()));
                }
            }
            Err(e) => {
                log::debug!("Polling {} failed: {}", rpc.endpoint(), e);
                if let Some(callback) = on_first.take() {
                    callback(Err(e));
                }
            }
        }
    }
}
