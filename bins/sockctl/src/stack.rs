//! Assembles a socket stack from configuration.

use std::sync::Arc;

use sockif::socket::{Backend, EndpointManager, RegistryBuilder, Result, StackConfig};
use sockif::usrsock::{Daemon, PolicyHandler, UsrsockBackend};
use tokio::runtime::Runtime;

/// A configured stack. Fields drop in declaration order: the manager (and
/// the usrsock backend inside it) goes before the daemon and its runtime.
pub struct Stack {
    pub manager: EndpointManager,
    _daemon: Option<Daemon>,
    _runtime: Option<Runtime>,
}

impl Stack {
    pub fn new(config: &StackConfig) -> Result<Self> {
        let builder = RegistryBuilder::new().with_config(config);

        if !config.usrsock.enabled {
            return Ok(Self {
                manager: EndpointManager::new(Arc::new(builder.build())),
                _daemon: None,
                _runtime: None,
            });
        }

        let handler = PolicyHandler::from_config(&config.usrsock.policy)?;
        let runtime = Runtime::new()?;
        let daemon = Daemon::spawn(runtime.handle(), handler);
        let proxy =
            UsrsockBackend::from_config(daemon.link(), runtime.handle().clone(), &config.usrsock);
        tracing::debug!(timeout_ms = config.usrsock.timeout_ms, "usrsock proxy enabled");

        let registry = builder.proxy(Backend::proxy(proxy)).build();
        Ok(Self {
            manager: EndpointManager::new(Arc::new(registry)),
            _daemon: Some(daemon),
            _runtime: Some(runtime),
        })
    }
}
