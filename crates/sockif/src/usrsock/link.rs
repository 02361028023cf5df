//! Request channel between the kernel side and a usrsock daemon.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::socket::{Error, Result};

type Envelope = (Bytes, oneshot::Sender<Bytes>);

/// Kernel-side end of a daemon connection.
///
/// Clones share the same daemon. When the daemon's [`DaemonPort`] is
/// dropped, every pending and future [`transact`](Self::transact) fails
/// with [`Error::NetworkDown`].
#[derive(Debug, Clone)]
pub struct DaemonLink {
    tx: mpsc::Sender<Envelope>,
}

impl DaemonLink {
    /// Create a connected link/port pair with room for `depth` queued
    /// requests.
    pub fn channel(depth: usize) -> (DaemonLink, DaemonPort) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (DaemonLink { tx }, DaemonPort { rx })
    }

    /// Send a request frame and wait for the daemon's reply frame.
    pub async fn transact(&self, frame: Bytes) -> Result<Bytes> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((frame, reply_tx))
            .await
            .map_err(|_| Error::NetworkDown)?;
        reply_rx.await.map_err(|_| Error::NetworkDown)
    }

    /// Check if the daemon end is still alive.
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Daemon-side end of a connection.
#[derive(Debug)]
pub struct DaemonPort {
    rx: mpsc::Receiver<Envelope>,
}

impl DaemonPort {
    /// Wait for the next request; `None` once every link is dropped.
    pub async fn recv(&mut self) -> Option<PendingRequest> {
        let (frame, reply) = self.rx.recv().await?;
        Some(PendingRequest { frame, reply })
    }
}

/// A request awaiting its reply.
///
/// Dropping it without responding fails the caller with `NetworkDown`.
#[derive(Debug)]
pub struct PendingRequest {
    frame: Bytes,
    reply: oneshot::Sender<Bytes>,
}

impl PendingRequest {
    /// Get the request frame.
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    /// Send the reply frame.
    pub fn respond(self, frame: Bytes) {
        // The caller may have timed out and gone away.
        let _ = self.reply.send(frame);
    }
}
