//! Production node factory

use super::config::{CoreConfig, NetConfig};
use super::error::NodeResult;
use super::handle::{NodeFactory, NodeHandle, NodeObserver};
use super::local::LocalNode;
use super::remote::RemoteNode;
use crate::currency::Currency;
use crate::logging::LoggerManager;
use std::sync::Arc;

/// Builds [`RemoteNode`]s and daemon-backed [`LocalNode`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct DaemonNodeFactory;

impl NodeFactory for DaemonNodeFactory {
    fn create_remote(
        &self,
        currency: &Currency,
        host: &str,
        port: u16,
        observer: Arc<dyn NodeObserver>,
    ) -> NodeResult<Box<dyn NodeHandle>> {
        Ok(Box::new(RemoteNode::new(currency.clone(), host, port, observer)?))
    }

    fn create_local(
        &self,
        currency: &Currency,
        logger: &LoggerManager,
        core_config: &CoreConfig,
        net_config: &NetConfig,
        observer: Arc<dyn NodeObserver>,
    ) -> NodeResult<Box<dyn NodeHandle>> {
        Ok(Box::new(LocalNode::new(
            currency.clone(),
            logger,
            core_config,
            net_config,
            observer,
        )?))
    }
}
