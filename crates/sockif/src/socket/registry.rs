//! Backend registry.
//!
//! The registry maps `(domain, type, protocol)` to a native backend and
//! holds at most one proxy backend. It is assembled once with
//! [`RegistryBuilder`] and never mutated afterwards, so any number of
//! creation calls can read it concurrently without locking.
//!
//! # Example
//!
//! ```ignore
//! use sockif::socket::{Backend, Domain, ProtocolMatch, RegistryBuilder, SockType};
//!
//! let registry = RegistryBuilder::new()
//!     .native(Domain::INET, &[SockType::STREAM], ProtocolMatch::Any, Backend::native(tcp))
//!     .proxy(Backend::proxy(usrsock))
//!     .build();
//!
//! assert!(registry.lookup(Domain::INET, SockType::STREAM, 0).is_some());
//! ```

use std::fmt;

use super::backend::Backend;
use super::config::StackConfig;
use super::types::{Domain, SockType};

/// Which protocol values a native entry claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolMatch {
    /// Any protocol; the backend validates it in `setup`.
    Any,
    /// Exactly this protocol.
    Exact(i32),
}

impl ProtocolMatch {
    fn matches(self, protocol: i32) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(p) => p == protocol,
        }
    }
}

/// One native registration.
#[derive(Debug, Clone)]
pub struct NativeEntry {
    domain: Domain,
    types: Vec<SockType>,
    protocol: ProtocolMatch,
    backend: Backend,
}

impl NativeEntry {
    /// Get the address family.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Get the accepted types (empty means any type).
    pub fn types(&self) -> &[SockType] {
        &self.types
    }

    /// Get the protocol matcher.
    pub fn protocol(&self) -> ProtocolMatch {
        self.protocol
    }

    /// Get the backend.
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    fn matches(&self, domain: Domain, ty: SockType, protocol: i32) -> bool {
        self.domain == domain
            && (self.types.is_empty() || self.types.contains(&ty))
            && self.protocol.matches(protocol)
    }
}

/// Immutable backend table.
#[derive(Clone, Default)]
pub struct Registry {
    native: Vec<NativeEntry>,
    proxy: Option<Backend>,
}

impl Registry {
    /// Create a builder.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Find the native backend for a request.
    ///
    /// Entries are tried in registration order and the first match wins.
    /// `None` is not an error here; the caller decides what it means.
    pub fn lookup(&self, domain: Domain, ty: SockType, protocol: i32) -> Option<&Backend> {
        self.native
            .iter()
            .find(|e| e.matches(domain, ty, protocol))
            .map(|e| &e.backend)
    }

    /// Get the proxy backend, if one is configured.
    pub fn proxy(&self) -> Option<&Backend> {
        self.proxy.as_ref()
    }

    /// Iterate over native entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &NativeEntry> {
        self.native.iter()
    }

    /// Check if no backend at all is registered.
    pub fn is_empty(&self) -> bool {
        self.native.is_empty() && self.proxy.is_none()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("native", &self.native)
            .field("proxy", &self.proxy)
            .finish()
    }
}

/// Builder for [`Registry`].
#[derive(Debug, Default)]
#[must_use = "builders do nothing unless built"]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a native backend for a family.
    ///
    /// An empty `types` slice accepts any type.
    pub fn native(
        mut self,
        domain: Domain,
        types: &[SockType],
        protocol: ProtocolMatch,
        backend: Backend,
    ) -> Self {
        self.registry.native.push(NativeEntry {
            domain,
            types: types.to_vec(),
            protocol,
            backend,
        });
        self
    }

    /// Set the proxy backend, replacing any previous one.
    pub fn proxy(mut self, backend: Backend) -> Self {
        self.registry.proxy = Some(backend);
        self
    }

    /// Register the built-in native families enabled in `config`.
    ///
    /// Families whose Cargo feature is disabled are skipped regardless of
    /// the configuration. The proxy is not touched: it needs a daemon link,
    /// which configuration alone cannot provide.
    pub fn with_config(self, config: &StackConfig) -> Self {
        let builder = self;
        #[cfg(feature = "inet")]
        let builder = builder.with_inet(config);
        #[cfg(feature = "local")]
        let builder = builder.with_local(config);
        #[cfg(not(any(feature = "inet", feature = "local")))]
        let _ = config;
        builder
    }

    #[cfg(feature = "inet")]
    fn with_inet(self, config: &StackConfig) -> Self {
        if !config.inet.enabled {
            return self;
        }
        let inet = Backend::native(crate::native::inet::InetBackend::new(&config.inet));
        let builder = self.native(Domain::INET, &[], ProtocolMatch::Any, inet.clone());
        if config.inet.ipv6 {
            builder.native(Domain::INET6, &[], ProtocolMatch::Any, inet)
        } else {
            builder
        }
    }

    #[cfg(feature = "local")]
    fn with_local(self, config: &StackConfig) -> Self {
        if !config.local.enabled {
            return self;
        }
        let local = Backend::native(crate::native::local::LocalBackend::new(&config.local));
        self.native(Domain::LOCAL, &[], ProtocolMatch::Any, local)
    }

    /// Freeze the registry.
    pub fn build(self) -> Registry {
        self.registry
    }
}
