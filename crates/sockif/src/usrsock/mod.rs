//! User-space socket proxy ("usrsock").
//!
//! A usrsock daemon lives outside the kernel stack and may serve any
//! address family. The kernel asks it first; the daemon creates the socket,
//! declines it (`ENOSYS` / `EOPNOTSUPP`), or fails it outright.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sockif::socket::{Backend, EndpointManager, PolicyAction, RegistryBuilder, StackConfig};
//! use sockif::usrsock::{Daemon, PolicyHandler, UsrsockBackend};
//!
//! let rt = tokio::runtime::Runtime::new()?;
//! let daemon = Daemon::spawn(rt.handle(), PolicyHandler::new(PolicyAction::Defer));
//! let proxy = UsrsockBackend::new(daemon.link(), rt.handle().clone(), Duration::from_secs(1));
//!
//! let registry = RegistryBuilder::new()
//!     .with_config(&StackConfig::default())
//!     .proxy(Backend::proxy(proxy))
//!     .build();
//! let manager = EndpointManager::new(Arc::new(registry));
//!
//! // The daemon defers, so the native inet backend serves this one.
//! let ep = manager.create_endpoint(libc::AF_INET, libc::SOCK_STREAM, 0, 0)?;
//! assert!(ep.backend().is_native());
//! ```

mod backend;
mod daemon;
mod link;
mod policy;
pub mod wire;

pub use backend::{UsrsockBackend, UsrsockConn};
pub use daemon::{Daemon, DaemonHandler};
pub use link::{DaemonLink, DaemonPort, PendingRequest};
pub use policy::PolicyHandler;
