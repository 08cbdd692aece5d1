//! Local node lifecycle worker
//!
//! Constructs, initializes and tears down local nodes on a dedicated thread
//! with its own runtime, so a slow daemon bring-up never stalls the caller.
//! The adapter talks to the worker only through requests with oneshot
//! replies; a node handle changes hands exactly when a reply is sent.

use super::config::{CoreConfig, NetConfig};
use super::error::{NodeError, NodeResult};
use super::handle::{NodeFactory, NodeHandle, NodeObserver};
use crate::currency::Currency;
use crate::logging::LoggerManager;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tokio::sync::{mpsc, oneshot};

/// Everything the worker needs to build a local node
pub struct LocalNodeRequest {
    pub currency: Currency,
    pub logger: Arc<LoggerManager>,
    pub core_config: CoreConfig,
    pub net_config: NetConfig,
    pub observer: Arc<dyn NodeObserver>,
}

enum WorkerRequest {
    Start {
        request: LocalNodeRequest,
        reply: oneshot::Sender<NodeResult<Box<dyn NodeHandle>>>,
    },
    Stop {
        node: Box<dyn NodeHandle>,
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the worker thread
pub struct NodeLifecycleWorker {
    requests: Option<mpsc::UnboundedSender<WorkerRequest>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl NodeLifecycleWorker {
    /// Start the worker thread
    pub fn spawn(factory: Arc<dyn NodeFactory>) -> io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let thread = thread::Builder::new()
            .name("node-initializer".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        log::error!("Failed to create node worker runtime: {}", e);
                        return;
                    }
                };
                rt.block_on(run_worker(factory, rx));
            })?;

        log::debug!("Node worker started");
        Ok(Self {
            requests: Some(tx),
            thread: Some(thread),
        })
    }

    /// Build and initialize a local node on the worker thread
    ///
    /// Resolves once the node's init completed. On success the initialized
    /// node is handed to the caller; on failure the worker has already
    /// destroyed it.
    pub async fn start(&self, request: LocalNodeRequest) -> NodeResult<Box<dyn NodeHandle>> {
        let (reply, response) = oneshot::channel();
        self.send(WorkerRequest::Start { request, reply })?;
        response
            .await
            .map_err(|_| NodeError::Internal("node worker dropped the start request".to_string()))?
    }

    /// Deinitialize and destroy a node on the worker thread
    pub async fn stop(&self, node: Box<dyn NodeHandle>) -> NodeResult<()> {
        let (reply, response) = oneshot::channel();
        self.send(WorkerRequest::Stop { node, reply })?;
        response
            .await
            .map_err(|_| NodeError::Internal("node worker dropped the stop request".to_string()))
    }

    fn send(&self, request: WorkerRequest) -> NodeResult<()> {
        let sender = self
            .requests
            .as_ref()
            .ok_or_else(|| NodeError::Internal("node worker is shut down".to_string()))?;
        sender
            .send(request)
            .map_err(|_| NodeError::Internal("node worker is not running".to_string()))
    }

    /// Whether the worker thread is still alive
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop accepting requests and wait for the thread to exit
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.requests.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Node worker thread panicked");
            } else {
                log::debug!("Node worker stopped");
            }
        }
    }
}

impl Drop for NodeLifecycleWorker {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_worker(factory: Arc<dyn NodeFactory>, mut requests: mpsc::UnboundedReceiver<WorkerRequest>) {
    while let Some(request) = requests.recv().await {
        match request {
            WorkerRequest::Start { request, reply } => {
                let outcome = start_local_node(factory.as_ref(), request).await;
                if let Err(Ok(mut node)) = reply.send(outcome) {
                    log::warn!("Local node started but nobody is waiting for it, stopping it");
                    node.deinit();
                }
            }
            WorkerRequest::Stop { mut node, reply } => {
                node.deinit();
                drop(node);
                let _ = reply.send(());
            }
        }
    }
}

async fn start_local_node(
    factory: &dyn NodeFactory,
    request: LocalNodeRequest,
) -> NodeResult<Box<dyn NodeHandle>> {
    let mut node = factory.create_local(
        &request.currency,
        &request.logger,
        &request.core_config,
        &request.net_config,
        request.observer,
    )?;

    let (done, completion) = oneshot::channel();
    let launched = panic::catch_unwind(AssertUnwindSafe(|| {
        node.init(Box::new(move |result| {
            let _ = done.send(result);
        }))
    }));
    if launched.is_err() {
        log::error!("Local node init panicked");
        return Err(NodeError::Internal("local node init panicked".to_string()));
    }

    match completion.await {
        Ok(Ok(())) => {
            log::info!("Local node initialized");
            Ok(node)
        }
        Ok(Err(e)) => {
            log::error!("Local node init failed: {} (code {})", e, e.code());
            node.deinit();
            Err(e)
        }
        Err(_) => {
            // The init task died without reporting back
            log::error!("Local node init aborted without completing");
            node.deinit();
            Err(NodeError::Internal("local node init aborted".to_string()))
        }
    }
}
