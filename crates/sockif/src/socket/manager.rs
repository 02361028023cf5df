//! Endpoint lifecycle manager: backend selection, usrsock fallback and
//! flag application.

use std::sync::Arc;

use super::backend::Backend;
use super::conn::{ConnFlags, Connection};
use super::endpoint::Endpoint;
use super::error::{Error, Result};
use super::registry::Registry;
use super::types::{CreateRequest, SockFlags};

/// Creates endpoints against an immutable [`Registry`].
///
/// The manager itself never blocks; the only suspension points are inside
/// backend `setup` calls (e.g. a usrsock daemon round trip).
#[derive(Debug, Clone)]
pub struct EndpointManager {
    registry: Arc<Registry>,
}

impl EndpointManager {
    /// Create a manager over a registry.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Get the registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Create an endpoint for `(domain, ty, protocol)`.
    ///
    /// `ty` may carry `SOCK_NONBLOCK` / `SOCK_CLOEXEC`; `flags` may carry
    /// the same two flags and nothing else.
    ///
    /// If a proxy backend is registered it is tried first. A proxy failure
    /// in the fallback class ([`Error::is_fallback`]) hands the request to
    /// the native set; any other proxy failure is returned as-is. When no
    /// native backend matches after such a fallback, the proxy's error is
    /// returned instead of `AddressFamilyNotSupported`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for unknown bits in `ty` or `flags`, before any
    ///   backend is called.
    /// - `AddressFamilyNotSupported` when no backend claims the request.
    /// - Anything a backend's `setup` returns, verbatim.
    pub fn create_endpoint(&self, domain: i32, ty: i32, protocol: i32, flags: i32) -> Result<Endpoint> {
        let req = CreateRequest::new(domain, ty, protocol, flags)?;
        let params = req.params();

        let mut deferred = None;

        if let Some(proxy) = self.registry.proxy() {
            match proxy.interface().setup(&params) {
                Ok(conn) => return Ok(finish(&req, proxy, conn)),
                Err(e) if e.is_fallback() => {
                    tracing::debug!(
                        domain = %req.domain,
                        ty = %req.ty,
                        protocol = req.protocol,
                        error = %e,
                        "usrsock declined, falling back to native stack"
                    );
                    deferred = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let Some(native) = self.registry.lookup(req.domain, req.ty, req.protocol) else {
            tracing::warn!(domain = %req.domain, "socket address family unsupported");
            return Err(deferred.unwrap_or(Error::AddressFamilyNotSupported {
                domain: req.domain.raw(),
            }));
        };

        match native.interface().setup(&params) {
            Ok(conn) => Ok(finish(&req, native, conn)),
            Err(e) => {
                tracing::warn!(backend = native.name(), error = %e, "socket setup failed");
                Err(e)
            }
        }
    }
}

/// Apply creation flags, mark the connection initialized and publish the
/// endpoint.
fn finish(req: &CreateRequest, backend: &Backend, mut conn: Connection) -> Endpoint {
    if req.flags.contains(SockFlags::NONBLOCK) {
        conn.insert_flags(ConnFlags::NONBLOCK);
    }
    conn.insert_flags(ConnFlags::INITD);

    tracing::debug!(
        domain = %req.domain,
        ty = %req.ty,
        protocol = req.protocol,
        backend = backend.name(),
        kind = %backend.kind(),
        "endpoint created"
    );

    Endpoint::new(
        req.domain,
        req.ty,
        req.protocol,
        req.flags.contains(SockFlags::CLOEXEC),
        backend.clone(),
        conn,
    )
}
