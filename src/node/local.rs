//! Node run by the wallet itself
//!
//! Launches the TuringX daemon with the wallet's core/network configuration,
//! waits for its RPC to answer and then polls it like a remote node. A
//! daemon left running by an earlier session is adopted instead of started
//! twice.

use super::config::{CoreConfig, NetConfig};
use super::error::{NodeError, NodeResult};
use super::handle::{InitCallback, NodeHandle, NodeKind, NodeObserver, WalletHandle};
use super::monitor::run_monitor;
use super::payment_id;
use super::rpc::{self, NodeRpcClient};
use super::state::ChainState;
use crate::currency::Currency;
use crate::logging::LoggerManager;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::task::JoinHandle;

/// How long a freshly started daemon gets to answer RPC
const READY_TIMEOUT: Duration = Duration::from_secs(120);

/// How long to wait for the daemon to exit after a stop request
const STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything needed to bring the daemon up, cloned into the init task
#[derive(Debug, Clone)]
struct DaemonLaunch {
    binary: PathBuf,
    process_name: String,
    data_dir: PathBuf,
    args: Vec<String>,
}

impl DaemonLaunch {
    fn new(
        currency: &Currency,
        logger: &LoggerManager,
        core_config: &CoreConfig,
        net_config: &NetConfig,
    ) -> Self {
        let mut args = core_config.to_args();
        args.extend(net_config.to_args());
        args.push(format!("--log-level={}", logger.daemon_log_level()));
        args.push(format!("--log-file={}", logger.daemon_log_path().display()));

        Self {
            binary: core_config.daemon_path.clone(),
            process_name: currency.daemon_binary_name(),
            data_dir: core_config.data_dir.clone(),
            args,
        }
    }

    /// Start the daemon unless one is already running
    fn spawn(&self) -> NodeResult<Option<Child>> {
        if let Some(pid) = find_daemon_pid(&self.process_name) {
            log::info!("Adopting running {} with PID {}", self.process_name, pid);
            return Ok(None);
        }

        if !self.binary.exists() {
            return Err(NodeError::DaemonNotFound(self.binary.clone()));
        }

        std::fs::create_dir_all(&self.data_dir)?;

        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.args);

        // Redirect stdio to null to prevent blocking; the daemon logs to its own file
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
        cmd.stdin(Stdio::null());

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        log::info!("Starting daemon: {:?}", cmd);
        let child = cmd.spawn()?;
        log::info!("{} started with PID {}", self.process_name, child.id());
        Ok(Some(child))
    }
}

/// Find the PID of a running daemon process
fn find_daemon_pid(process_name: &str) -> Option<u32> {
    let mut sys = System::new();
    sys.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::new());

    let wanted = process_name.to_lowercase();
    sys.processes()
        .iter()
        .find(|(_, process)| process.name().to_string_lossy().to_lowercase() == wanted)
        .map(|(pid, _)| pid.as_u32())
}

/// Wallet-managed node
pub struct LocalNode {
    currency: Currency,
    launch: DaemonLaunch,
    rpc: NodeRpcClient,
    observer: Arc<dyn NodeObserver>,
    chain: Arc<ChainState>,
    /// Child process handle (if we spawned it)
    process: Arc<Mutex<Option<Child>>>,
    /// Bring-up and polling task (if initialized)
    task: Option<JoinHandle<()>>,
}

impl LocalNode {
    pub fn new(
        currency: Currency,
        logger: &LoggerManager,
        core_config: &CoreConfig,
        net_config: &NetConfig,
        observer: Arc<dyn NodeObserver>,
    ) -> NodeResult<Self> {
        let launch = DaemonLaunch::new(&currency, logger, core_config, net_config);
        let rpc = NodeRpcClient::new("127.0.0.1", core_config.rpc_bind_port)?;

        Ok(Self {
            currency,
            launch,
            rpc,
            observer,
            chain: Arc::new(ChainState::new()),
            process: Arc::new(Mutex::new(None)),
            task: None,
        })
    }

    /// Daemon arguments this node launches with
    pub fn daemon_args(&self) -> &[String] {
        &self.launch.args
    }

    fn assert_initialized(&self) {
        assert!(self.task.is_some(), "local node used while not initialized");
    }

    /// Check if we have the child process handle (we started it)
    pub fn has_process_handle(&self) -> bool {
        lock(&self.process).is_some()
    }

    fn stop_daemon(&self) {
        // The RPC call needs a runtime of its own; we may be on a runtime thread
        let rpc = self.rpc.clone();
        let stopped = std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().ok()?;
            rt.block_on(async { rpc::stop_node_gracefully(&rpc).await.ok() })
        })
        .join();

        match stopped {
            Ok(Some(())) => log::info!("RPC stop command sent - daemon will shut down"),
            _ => log::warn!("RPC stop command failed - daemon may not be running"),
        }

        let Some(mut child) = lock(&self.process).take() else {
            return;
        };

        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    log::info!("Daemon exited with {}", status);
                    return;
                }
                Ok(None) if start.elapsed() < STOP_TIMEOUT => {
                    std::thread::sleep(Duration::from_millis(500));
                }
                Ok(None) => {
                    log::warn!("Daemon did not stop within {:?}, killing it", STOP_TIMEOUT);
                    break;
                }
                Err(e) => {
                    log::warn!("Failed to query daemon status: {}", e);
                    break;
                }
            }
        }

        if let Err(e) = child.kill() {
            log::error!("Failed to kill daemon: {}", e);
        }
        let _ = child.wait();
    }
}

fn lock(process: &Mutex<Option<Child>>) -> std::sync::MutexGuard<'_, Option<Child>> {
    process.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Start the daemon and wait until its RPC answers
async fn bring_up(
    launch: &DaemonLaunch,
    rpc: &NodeRpcClient,
    process: &Mutex<Option<Child>>,
) -> NodeResult<()> {
    let child = launch.spawn()?;
    *lock(process) = child;

    let ready = rpc::wait_for_node_ready(rpc, READY_TIMEOUT).await;
    if ready.is_err() {
        if let Some(status) = lock(process).as_mut().and_then(|c| c.try_wait().ok().flatten()) {
            return Err(NodeError::Internal(format!("daemon exited early with {}", status)));
        }
    }
    ready
}

impl NodeHandle for LocalNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Local
    }

    fn init(&mut self, on_complete: InitCallback) {
        let launch = self.launch.clone();
        let rpc = self.rpc.clone();
        let process = self.process.clone();
        let chain = self.chain.clone();
        let observer = self.observer.clone();

        let task = tokio::spawn(async move {
            match bring_up(&launch, &rpc, &process).await {
                Ok(()) => {
                    // Seed the chain state before reporting readiness
                    match rpc.sample().await {
                        Ok(snapshot) => chain.apply(snapshot, observer.as_ref()),
                        Err(e) => log::warn!("Initial chain poll failed: {}", e),
                    }
                    on_complete(Ok(()));
                    run_monitor(rpc, chain, observer, None).await;
                }
                Err(e) => {
                    log::error!("Local node failed to start: {}", e);
                    on_complete(Err(e));
                }
            }
        });

        if let Some(previous) = self.task.replace(task) {
            log::warn!("Local node initialized twice, dropping the older task");
            previous.abort();
        }
    }

    fn deinit(&mut self) {
        let Some(task) = self.task.take() else {
            log::warn!("Local node deinitialized while not initialized");
            return;
        };

        log::info!("Stopping local node...");
        task.abort();
        self.stop_daemon();
        self.chain.reset();
        log::info!("Local node stopped");
    }

    fn peer_count(&self) -> usize {
        self.assert_initialized();
        self.chain.snapshot().peer_count
    }

    fn last_known_block_height(&self) -> u64 {
        self.assert_initialized();
        self.chain.snapshot().known_height
    }

    fn last_local_block_height(&self) -> u64 {
        self.assert_initialized();
        self.chain.snapshot().local_height
    }

    fn last_local_block_timestamp(&self) -> u64 {
        self.assert_initialized();
        self.chain.snapshot().last_block_timestamp
    }

    fn convert_payment_id(&self, text: &str) -> NodeResult<Vec<u8>> {
        payment_id::parse_payment_id(text)
    }

    fn extract_payment_id(&self, extra: &[u8]) -> String {
        payment_id::extract_payment_id(extra)
    }

    fn create_wallet(&self) -> WalletHandle {
        WalletHandle::new(NodeKind::Local, self.currency.clone(), self.chain.clone())
    }
}

impl Drop for LocalNode {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.deinit();
        }
    }
}
