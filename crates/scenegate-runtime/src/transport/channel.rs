//! Connection handle shared between the transport adapter and the core.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Cloneable handle to one live connection: identity, liveness, and the
/// outbound byte queue drained by the transport's writer task.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    id: u64,
    remote: Option<SocketAddr>,
    tx: mpsc::Sender<Bytes>,
    active: AtomicBool,
}

impl Channel {
    pub fn new(id: u64, remote: Option<SocketAddr>, tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                id,
                remote,
                tx,
                active: AtomicBool::new(true),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Remote `ip:port`, or the placeholder when unknown or closed.
    pub fn remote_addr(&self) -> String {
        match (self.is_active(), self.inner.remote) {
            (true, Some(addr)) => addr.to_string(),
            _ => "0.0.0.0:0000".to_string(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Relaxed)
    }

    /// Mark the connection closed. The transport adapter calls this before
    /// tearing the socket down; later sends report failure.
    pub fn close(&self) {
        self.inner.active.store(false, Ordering::Relaxed);
    }

    /// Queue bytes for the writer task. Returns false (with a log) when
    /// the connection is inactive, the queue is full, or the writer is
    /// gone — the caller decides any retry policy.
    pub fn send_bytes(&self, bytes: Bytes) -> bool {
        if !self.is_active() {
            tracing::info!(channel = self.inner.id, "send failed, connection closed");
            return false;
        }
        match self.inner.tx.try_send(bytes) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(channel = self.inner.id, "send failed: {e}");
                false
            }
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.inner.id)
            .field("remote", &self.inner.remote)
            .field("active", &self.is_active())
            .finish()
    }
}
