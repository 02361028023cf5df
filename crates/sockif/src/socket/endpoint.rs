//! Endpoints handed out by the lifecycle manager.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::backend::{Backend, BackendKind};
use super::conn::{ConnFlags, Connection};
use super::error::Result;
use super::types::{Domain, SockType};

/// A fully initialized communication endpoint.
///
/// Values of this type only exist once a backend's `setup` has succeeded
/// and the manager has set `INITD`, so every `Endpoint` is usable.
///
/// The connection state is shared between an endpoint and its duplicates
/// (see [`Endpoint::dup`]) and released through the backend when the last
/// handle is closed or dropped. Dropping reports backend errors only through
/// the log; use [`Endpoint::close`] to see them.
///
/// Releasing a usrsock endpoint blocks on the daemon runtime, so the last
/// handle must not be dropped on one of that runtime's worker threads.
#[derive(Debug)]
pub struct Endpoint {
    domain: Domain,
    ty: SockType,
    protocol: i32,
    cloexec: bool,
    shared: Arc<Shared>,
}

/// State shared by an endpoint and its duplicates.
#[derive(Debug)]
struct Shared {
    backend: Backend,
    conn: Mutex<Connection>,
    released: bool,
}

impl Shared {
    /// Hand the connection back to the backend, once.
    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let slot = self.conn.get_mut().unwrap_or_else(PoisonError::into_inner);
        let conn = mem::replace(slot, Connection::new(()));
        tracing::debug!(backend = self.backend.name(), "closing endpoint");
        self.backend.interface().close(conn)
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(
                backend = self.backend.name(),
                error = %e,
                "backend close failed for dropped endpoint"
            );
        }
    }
}

impl Endpoint {
    pub(crate) fn new(
        domain: Domain,
        ty: SockType,
        protocol: i32,
        cloexec: bool,
        backend: Backend,
        conn: Connection,
    ) -> Self {
        debug_assert!(conn.is_initialized());
        Self {
            domain,
            ty,
            protocol,
            cloexec,
            shared: Arc::new(Shared {
                backend,
                conn: Mutex::new(conn),
                released: false,
            }),
        }
    }

    /// Get the address family.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Get the transport style (flags masked off).
    pub fn sock_type(&self) -> SockType {
        self.ty
    }

    /// Get the protocol as requested by the caller.
    pub fn protocol(&self) -> i32 {
        self.protocol
    }

    /// Check if close-on-exec was requested for this handle.
    pub fn cloexec(&self) -> bool {
        self.cloexec
    }

    /// Get the backend serving this endpoint.
    pub fn backend(&self) -> &Backend {
        &self.shared.backend
    }

    /// Get the backend kind.
    pub fn backend_kind(&self) -> BackendKind {
        self.shared.backend.kind()
    }

    /// Get a snapshot of the connection flags.
    pub fn flags(&self) -> ConnFlags {
        self.lock().flags()
    }

    /// Check if the endpoint is non-blocking.
    pub fn is_nonblocking(&self) -> bool {
        self.flags().contains(ConnFlags::NONBLOCK)
    }

    /// Switch non-blocking mode on or off.
    ///
    /// The flag lives in the shared connection state, so duplicates see the
    /// change too.
    pub fn set_nonblocking(&self, nonblocking: bool) {
        self.lock().set_flag(ConnFlags::NONBLOCK, nonblocking);
    }

    /// Run `f` with the connection state locked.
    pub fn with_connection<R>(&self, f: impl FnOnce(&mut Connection) -> R) -> R {
        f(&mut self.lock())
    }

    /// Get the number of handles sharing this connection state.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.shared)
    }

    /// Create a second handle to the same connection state.
    ///
    /// The duplicate never carries close-on-exec.
    pub fn dup(&self) -> Endpoint {
        Endpoint {
            domain: self.domain,
            ty: self.ty,
            protocol: self.protocol,
            cloexec: false,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Close this handle.
    ///
    /// The backend's `close` runs only when this is the last handle; closing
    /// a duplicate just drops the reference. When the last handles are closed
    /// concurrently, exactly one of them runs the backend's `close`.
    pub fn close(self) -> Result<()> {
        match Arc::into_inner(self.shared) {
            Some(mut shared) => shared.release(),
            None => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.shared.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
