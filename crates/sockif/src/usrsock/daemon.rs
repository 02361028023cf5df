//! In-process usrsock daemon.

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::link::{DaemonLink, DaemonPort};
use super::wire::{Ack, REQ_CLOSE, REQ_SOCKET, ReqHeader, Request};

/// Queue depth of the daemon request channel.
const DEFAULT_DEPTH: usize = 32;

/// Answers daemon requests.
///
/// Return values follow the wire convention: a socket id (or 0 for close)
/// on success, a negated errno on failure. Calls run on the runtime's
/// blocking pool, one at a time, so a handler may block.
pub trait DaemonHandler: Send + 'static {
    /// Handle a `SOCKET` request.
    fn socket(&mut self, domain: i32, ty: i32, protocol: i32) -> i32;

    /// Handle a `CLOSE` request.
    fn close(&mut self, usockid: i32) -> i32;
}

/// A daemon task serving one [`DaemonLink`].
#[derive(Debug)]
pub struct Daemon {
    link: DaemonLink,
    runtime: Handle,
    task: Option<JoinHandle<()>>,
}

impl Daemon {
    /// Spawn `handler` as a daemon task on `runtime`.
    pub fn spawn<H: DaemonHandler>(runtime: &Handle, handler: H) -> Self {
        let (link, port) = DaemonLink::channel(DEFAULT_DEPTH);
        let task = runtime.spawn(serve(port, handler));
        tracing::debug!("usrsock daemon started");
        Self {
            link,
            runtime: runtime.clone(),
            task: Some(task),
        }
    }

    /// Get a link to this daemon.
    pub fn link(&self) -> DaemonLink {
        self.link.clone()
    }

    /// Stop the daemon and wait until it is gone.
    ///
    /// Requests sent afterwards fail with `NetworkDown`. Blocks on the
    /// runtime, so it must not be called from one of its worker threads.
    pub fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // A cancelled task reports JoinError::Cancelled; that is the
            // expected outcome here.
            let _ = self.runtime.block_on(task);
            tracing::debug!("usrsock daemon stopped");
        }
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Handlers may block, so each request is answered on the blocking pool and
/// the runtime workers stay free to drive timers.
async fn serve<H: DaemonHandler>(mut port: DaemonPort, mut handler: H) {
    while let Some(req) = port.recv().await {
        let answered = tokio::task::spawn_blocking(move || {
            let ack = answer(&mut handler, req.frame());
            req.respond(ack.encode());
            handler
        })
        .await;

        match answered {
            Ok(h) => handler = h,
            Err(e) => {
                tracing::warn!(error = %e, "usrsock daemon handler failed, stopping");
                return;
            }
        }
    }
}

/// Build the acknowledgement for one request frame.
fn answer<H: DaemonHandler>(handler: &mut H, frame: &[u8]) -> Ack {
    let head = match ReqHeader::from_bytes(frame) {
        Ok(head) => head,
        Err(e) => {
            tracing::warn!(error = %e, "usrsock daemon dropped malformed request");
            return Ack::new(0, -e.errno());
        }
    };

    let result = match Request::decode(frame) {
        Ok(Request::Socket {
            domain,
            ty,
            protocol,
            ..
        }) => handler.socket(domain, ty, protocol),
        Ok(Request::Close { usockid, .. }) => handler.close(usockid),
        Err(_) if head.reqid != REQ_SOCKET && head.reqid != REQ_CLOSE => -libc::ENOSYS,
        Err(e) => -e.errno(),
    };

    tracing::trace!(reqid = head.reqid, xid = head.xid, result, "usrsock request answered");
    Ack::new(head.xid, result)
}
