//! Proxy backend that forwards endpoint setup to a usrsock daemon.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;

use crate::socket::{Connection, Error, Result, SocketInterface, SocketParams, UsrsockConfig};

use super::link::DaemonLink;
use super::wire::{Ack, Request};

/// Backend-private state of a daemon-backed endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsrsockConn {
    usockid: i32,
}

impl UsrsockConn {
    /// Get the daemon's id for this socket.
    pub fn usockid(&self) -> i32 {
        self.usockid
    }
}

/// The usrsock proxy backend.
///
/// `setup` and `close` block the calling thread on `runtime` for one daemon
/// round trip, bounded by the configured timeout. They must be called from
/// outside the runtime's worker threads.
#[derive(Debug)]
pub struct UsrsockBackend {
    link: DaemonLink,
    runtime: Handle,
    timeout: Duration,
    xid: AtomicU32,
}

impl UsrsockBackend {
    /// Create a backend talking over `link`.
    pub fn new(link: DaemonLink, runtime: Handle, timeout: Duration) -> Self {
        Self {
            link,
            runtime,
            timeout,
            xid: AtomicU32::new(1),
        }
    }

    /// Create a backend using the timeout from configuration.
    pub fn from_config(link: DaemonLink, runtime: Handle, config: &UsrsockConfig) -> Self {
        Self::new(link, runtime, Duration::from_millis(config.timeout_ms))
    }

    /// Get the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn next_xid(&self) -> u32 {
        self.xid.fetch_add(1, Ordering::Relaxed)
    }

    /// Send one request and wait for the daemon's acknowledgement.
    ///
    /// The exchange runs as a task on the runtime, so a reply arriving after
    /// the timeout is still received. A late `SOCKET` reply that created a
    /// socket gets that socket closed again.
    fn exchange(&self, req: &Request) -> Result<Ack> {
        if !self.link.is_connected() {
            return Err(Error::NetworkDown);
        }

        let link = self.link.clone();
        let frame = req.encode();
        let mut reply = self
            .runtime
            .spawn(async move { link.transact(frame).await });

        let waited = self
            .runtime
            .block_on(async { tokio::time::timeout(self.timeout, &mut reply).await });

        match waited {
            Ok(joined) => {
                let frame = joined.map_err(|_| Error::NetworkDown)??;
                Ack::decode(&frame)
            }
            Err(_) => {
                if let Request::Socket { xid, .. } = *req {
                    let close_xid = self.next_xid();
                    let link = self.link.clone();
                    self.runtime.spawn(async move {
                        let Ok(Ok(frame)) = reply.await else { return };
                        let Ok(ack) = Ack::decode(&frame) else { return };
                        if ack.result >= 0 {
                            tracing::debug!(xid, usockid = ack.result, "closing late usrsock socket");
                            let close = Request::Close {
                                xid: close_xid,
                                usockid: ack.result,
                            };
                            if let Err(e) = link.transact(close.encode()).await {
                                tracing::warn!(error = %e, "failed to close late usrsock socket");
                            }
                        }
                    });
                }
                Err(Error::TimedOut)
            }
        }
    }

    /// Close a daemon socket this backend will not hand out.
    fn discard(&self, usockid: i32) {
        let req = Request::Close {
            xid: self.next_xid(),
            usockid,
        };
        let closed = self.exchange(&req).and_then(|ack| ack.into_result(req.xid()));
        if let Err(e) = closed {
            tracing::warn!(usockid, error = %e, "failed to close discarded usrsock socket");
        }
    }
}

impl SocketInterface for UsrsockBackend {
    fn name(&self) -> &'static str {
        "usrsock"
    }

    fn setup(&self, params: &SocketParams) -> Result<Connection> {
        let req = Request::Socket {
            xid: self.next_xid(),
            domain: params.domain.raw(),
            ty: params.ty.raw(),
            protocol: params.protocol,
        };

        let ack = self.exchange(&req)?;
        if ack.xid != req.xid() && ack.result >= 0 {
            // Mismatched replies fail the setup; do not leak what they created.
            self.discard(ack.result);
        }

        // Fill in the request for the two errors that carry it.
        let usockid = ack.into_result(req.xid()).map_err(|e| match e {
            Error::AddressFamilyNotSupported { .. } => Error::AddressFamilyNotSupported {
                domain: params.domain.raw(),
            },
            Error::ProtocolNotSupported { .. } => Error::ProtocolNotSupported {
                ty: params.ty.raw(),
                protocol: params.protocol,
            },
            other => other,
        })?;

        tracing::trace!(usockid, domain = %params.domain, "usrsock socket created");
        Ok(Connection::new(UsrsockConn { usockid }))
    }

    fn close(&self, conn: Connection) -> Result<()> {
        let Some(state) = conn.into_private::<UsrsockConn>() else {
            return Err(Error::InvalidArgument(
                "connection was not created by usrsock".into(),
            ));
        };

        let req = Request::Close {
            xid: self.next_xid(),
            usockid: state.usockid,
        };
        self.exchange(&req)?.into_result(req.xid())?;
        Ok(())
    }
}
