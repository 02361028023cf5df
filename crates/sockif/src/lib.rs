//! Socket interface dispatch layer for an RTOS network stack.
//!
//! This crate turns a generic `(domain, type, protocol)` request into a live,
//! backend-bound endpoint. Backends are either built into the kernel stack
//! (the "native" set) or provided by a user-space socket proxy daemon
//! ("usrsock"), which the kernel tries first and falls back from.
//!
//! # Features
//!
//! - `inet` - Native AF_INET/AF_INET6 backend
//! - `local` - Native AF_LOCAL backend
//! - `usrsock` - User-space socket proxy backend and daemon link
//!
//! All three are enabled by default.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sockif::socket::{EndpointManager, RegistryBuilder, StackConfig, Domain, SockType};
//!
//! let registry = RegistryBuilder::new()
//!     .with_config(&StackConfig::default())
//!     .build();
//! let manager = EndpointManager::new(Arc::new(registry));
//!
//! let ep = manager.create_endpoint(
//!     Domain::INET.raw(),
//!     SockType::STREAM.raw() | sockif::socket::SOCK_NONBLOCK,
//!     0,
//!     0,
//! )?;
//! assert!(ep.is_nonblocking());
//! ep.close()?;
//! ```
//!
//! # Fallback
//!
//! When a usrsock backend is registered, every creation request goes to the
//! daemon first. The daemon answers `ENOSYS` or `EOPNOTSUPP` to hand a
//! request back to the kernel, and a daemon that is not running yields
//! `ENETDOWN`; in those three cases the request is served by the native set
//! instead. Any other daemon error is final.

// Core modules (always available)
pub mod native;
pub mod socket;

// Feature-gated modules
#[cfg(feature = "usrsock")]
pub mod usrsock;

// Re-export common types at crate root for convenience
pub use socket::{Endpoint, EndpointManager, Error, Registry, Result};
