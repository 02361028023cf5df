//! Built-in native backends.
//!
//! Each family is compiled in by its Cargo feature and registered by
//! [`RegistryBuilder::with_config`](crate::socket::RegistryBuilder::with_config)
//! when enabled in the configuration. The transport state machines behind
//! these backends are out of scope here: `setup` validates the request,
//! reserves a connection slot and records what the protocol layer needs.

#[cfg(feature = "inet")]
pub mod inet;
#[cfg(feature = "local")]
pub mod local;
#[cfg(any(feature = "inet", feature = "local"))]
mod pool;

#[cfg(any(feature = "inet", feature = "local"))]
pub use pool::{ConnPool, PoolSlot};
