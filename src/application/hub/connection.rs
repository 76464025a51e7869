//! Live socket connection handle

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use crate::shared::errors::GatewayError;

/// Identifies one accepted socket for the lifetime of the process
pub type ConnectionId = u64;

/// Messages a socket may have waiting before it counts as dead
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Work item for the task that owns a socket's write half
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// Cloneable handle to a live socket.
///
/// The socket itself is owned by a single writer task reading from the
/// matching [`OutboundQueue`]; every write goes through this bounded channel
/// so two writers never touch the sink at once. A peer that stops reading
/// fills the queue, and the next write fails instead of buffering forever.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    label: String,
    sender: mpsc::Sender<Outbound>,
    closed: Arc<AtomicBool>,
}

/// Receiving end of a connection's write queue.
///
/// Once the handle is closed, anything still queued is replaced by a single
/// [`Outbound::Close`], so a close is never lost behind a full queue.
#[derive(Debug)]
pub struct OutboundQueue {
    receiver: mpsc::Receiver<Outbound>,
    closed: Arc<AtomicBool>,
}

impl OutboundQueue {
    pub async fn recv(&mut self) -> Option<Outbound> {
        let next = self.receiver.recv().await?;
        Some(self.after_close(next))
    }

    pub fn try_recv(&mut self) -> Result<Outbound, TryRecvError> {
        self.receiver.try_recv().map(|next| self.after_close(next))
    }

    fn after_close(&self, next: Outbound) -> Outbound {
        if self.closed.load(Ordering::SeqCst) {
            Outbound::Close
        } else {
            next
        }
    }
}

impl ConnectionHandle {
    /// Create a handle together with the receiving end of its write queue.
    pub fn channel(id: ConnectionId, label: impl Into<String>) -> (Self, OutboundQueue) {
        Self::with_capacity(id, label, OUTBOUND_QUEUE_CAPACITY)
    }

    pub fn with_capacity(
        id: ConnectionId,
        label: impl Into<String>,
        capacity: usize,
    ) -> (Self, OutboundQueue) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let closed = Arc::new(AtomicBool::new(false));
        let handle = Self {
            id,
            label: label.into(),
            sender,
            closed: closed.clone(),
        };
        (handle, OutboundQueue { receiver, closed })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Device id for hardware, `"dashboard"` for subscribers
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Queue a text message. Fails once the connection is closed, its
    /// writer task is gone, or its queue is full.
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), GatewayError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(self.lost("closed"));
        }
        self.sender
            .try_send(Outbound::Text(text.into()))
            .map_err(|e| match e {
                TrySendError::Full(_) => self.lost("outbound queue full"),
                TrySendError::Closed(_) => self.lost("writer gone"),
            })
    }

    /// Ask the writer task to close the socket. Returns `true` for the call
    /// that actually closed it.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        // a full queue already wakes the writer, which then sees the flag
        let _ = self.sender.try_send(Outbound::Close);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.sender.is_closed()
    }

    fn lost(&self, reason: &str) -> GatewayError {
        GatewayError::ConnectionLost(format!("{}#{} ({})", self.label, self.id, reason))
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_delivers_text() {
        let (conn, mut rx) = ConnectionHandle::channel(1, "CP001");
        conn.send_text("hello").unwrap();
        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("hello".into()));
    }

    #[test]
    fn send_after_receiver_dropped_is_connection_lost() {
        let (conn, rx) = ConnectionHandle::channel(1, "CP001");
        drop(rx);
        assert_eq!(
            conn.send_text("msg"),
            Err(GatewayError::ConnectionLost("CP001#1 (writer gone)".into()))
        );
        assert!(conn.is_closed());
    }

    #[test]
    fn full_queue_is_connection_lost() {
        let (conn, mut rx) = ConnectionHandle::with_capacity(4, "dashboard", 2);
        conn.send_text("a").unwrap();
        conn.send_text("b").unwrap();
        assert_eq!(
            conn.send_text("c"),
            Err(GatewayError::ConnectionLost("dashboard#4 (outbound queue full)".into()))
        );

        // draining makes room again
        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("a".into()));
        assert!(conn.send_text("c").is_ok());
    }

    #[test]
    fn close_behind_a_full_queue_still_reaches_the_writer() {
        let (conn, mut rx) = ConnectionHandle::with_capacity(5, "CP002", 1);
        conn.send_text("stuck").unwrap();
        assert!(conn.close());
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn close_is_signalled_once() {
        let (conn, mut rx) = ConnectionHandle::channel(2, "dashboard");
        let clone = conn.clone();
        assert!(conn.close());
        assert!(!clone.close());
        assert!(clone.is_closed());
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
        assert!(rx.try_recv().is_err());
        assert!(clone.send_text("late").is_err());
    }
}
