//! Backend capability interface and the tagged descriptor around it.
//!
//! A backend implements [`SocketInterface`]. The registry stores backends
//! as [`Backend`] values, which tag each interface as either part of the
//! native kernel stack or the user-space proxy. The lifecycle manager picks
//! between the two with an explicit match; nothing is dispatched through a
//! class hierarchy.

use std::fmt;
use std::sync::Arc;

use super::conn::Connection;
use super::error::Result;
use super::types::SocketParams;

/// Operations every backend provides.
///
/// Only `setup` and `close` are part of the dispatch core; bind, connect,
/// send and receive live on the protocol implementations behind these.
pub trait SocketInterface: Send + Sync {
    /// Short name used in logs and listings (e.g. `"inet"`, `"usrsock"`).
    fn name(&self) -> &'static str;

    /// Create backend-private state for a new endpoint.
    ///
    /// On failure the backend must release anything it allocated; the
    /// caller never sees partial state.
    fn setup(&self, params: &SocketParams) -> Result<Connection>;

    /// Release the state created by `setup`.
    fn close(&self, conn: Connection) -> Result<()> {
        drop(conn);
        Ok(())
    }
}

/// Which side of the fallback a backend sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Implemented inside the kernel network stack.
    Native,
    /// Forwarded to the user-space socket proxy daemon.
    Proxy,
}

impl BackendKind {
    /// Get the lowercase name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Proxy => "proxy",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backend descriptor as stored in the registry.
///
/// Cloning is cheap and yields a descriptor that compares equal to the
/// original (see [`Backend::same_as`]).
#[derive(Clone)]
pub enum Backend {
    /// Native kernel stack backend.
    Native(Arc<dyn SocketInterface>),
    /// User-space proxy backend.
    Proxy(Arc<dyn SocketInterface>),
}

impl Backend {
    /// Wrap a native backend.
    pub fn native<I: SocketInterface + 'static>(iface: I) -> Self {
        Self::Native(Arc::new(iface))
    }

    /// Wrap a proxy backend.
    pub fn proxy<I: SocketInterface + 'static>(iface: I) -> Self {
        Self::Proxy(Arc::new(iface))
    }

    /// Get the kind tag.
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Native(_) => BackendKind::Native,
            Self::Proxy(_) => BackendKind::Proxy,
        }
    }

    /// Get the underlying interface.
    pub fn interface(&self) -> &dyn SocketInterface {
        match self {
            Self::Native(iface) | Self::Proxy(iface) => iface.as_ref(),
        }
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        self.interface().name()
    }

    /// Check if this is the native variant.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native(_))
    }

    /// Check if this is the proxy variant.
    pub fn is_proxy(&self) -> bool {
        matches!(self, Self::Proxy(_))
    }

    /// Check if both descriptors refer to the same backend instance.
    pub fn same_as(&self, other: &Backend) -> bool {
        let (Self::Native(a) | Self::Proxy(a)) = self;
        let (Self::Native(b) | Self::Proxy(b)) = other;
        self.kind() == other.kind() && Arc::ptr_eq(a, b)
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    impl SocketInterface for Dummy {
        fn name(&self) -> &'static str {
            "dummy"
        }

        fn setup(&self, _params: &SocketParams) -> Result<Connection> {
            Ok(Connection::new(()))
        }
    }

    #[test]
    fn kind_tags() {
        let native = Backend::native(Dummy);
        let proxy = Backend::proxy(Dummy);
        assert!(native.is_native());
        assert!(proxy.is_proxy());
        assert_eq!(native.kind().to_string(), "native");
        assert_eq!(proxy.kind().to_string(), "proxy");
        assert_eq!(native.name(), "dummy");
    }

    #[test]
    fn same_as_is_identity() {
        let a = Backend::native(Dummy);
        let b = Backend::native(Dummy);
        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
    }

    #[test]
    fn same_as_respects_kind() {
        let iface: Arc<dyn SocketInterface> = Arc::new(Dummy);
        let native = Backend::Native(Arc::clone(&iface));
        let proxy = Backend::Proxy(iface);
        assert!(!native.same_as(&proxy));
    }
}
