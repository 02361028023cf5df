//! Socket creation and backend dispatch.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use sockif::socket::{EndpointManager, RegistryBuilder, StackConfig};
//!
//! let registry = RegistryBuilder::new()
//!     .with_config(&StackConfig::default())
//!     .build();
//! let manager = EndpointManager::new(Arc::new(registry));
//!
//! let ep = manager.create_endpoint(libc::AF_INET, libc::SOCK_DGRAM, 0, 0)?;
//! println!("{} endpoint served by {}", ep.sock_type(), ep.backend().name());
//! ```
//!
//! # Pieces
//!
//! - [`Registry`] / [`RegistryBuilder`]: the immutable backend table.
//! - [`SocketInterface`] / [`Backend`]: the capability every backend provides,
//!   tagged native or proxy.
//! - [`EndpointManager`]: selection, fallback and flag application.
//! - [`Endpoint`] / [`Connection`]: what a successful creation yields.

mod backend;
mod config;
mod conn;
mod endpoint;
mod error;
mod manager;
mod registry;
mod types;

pub use backend::{Backend, BackendKind, SocketInterface};
pub use config::{InetConfig, LocalConfig, PolicyAction, PolicyConfig, StackConfig, UsrsockConfig};
pub use conn::{ConnFlags, Connection};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use manager::EndpointManager;
pub use registry::{NativeEntry, ProtocolMatch, Registry, RegistryBuilder};
pub use types::{
    CreateRequest, Domain, SOCK_CLOEXEC, SOCK_NONBLOCK, SOCK_TYPE_MASK, SockFlags, SockType,
    SocketParams,
};
