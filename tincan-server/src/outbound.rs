use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::warn;

use tincan_core::SessionId;

/// One frame queued for a peer's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// A single text line.
    Line(String),
    /// Flush a close frame with this reason, then stop writing.
    Close { reason: &'static str },
}

/// What became of an attempted delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Queued,
    /// The outbox is full; the peer is unhealthy and must be dropped.
    Overflow,
    /// No live outbox for this session.
    Gone,
}

/// Process-wide map from session to its bounded outbox.
///
/// The transport registers an outbox on accept and removes it during
/// teardown; the coordinator delivers through it without ever blocking.
/// Frames queued before removal are still drained by the writer task, so a
/// `ROOM_FULL` response always reaches the wire ahead of its close frame.
#[derive(Clone, Default)]
pub struct PeerRegistry {
    peers: Arc<DashMap<SessionId, mpsc::Sender<OutboundFrame>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session: SessionId, outbox: mpsc::Sender<OutboundFrame>) {
        self.peers.insert(session, outbox);
    }

    pub fn unregister(&self, session: &SessionId) {
        self.peers.remove(session);
    }

    /// Queues one line for a session. Never blocks.
    pub fn send_line(&self, session: &SessionId, line: String) -> SendOutcome {
        let Some(outbox) = self.peers.get(session) else {
            // The peer may have disconnected while its event was in flight.
            warn!(%session, "send to a session with no live outbox");
            return SendOutcome::Gone;
        };
        match outbox.try_send(OutboundFrame::Line(line)) {
            Ok(()) => SendOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => SendOutcome::Overflow,
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::Gone,
        }
    }

    /// Queues a close frame and forgets the outbox, so nothing further can
    /// be sent to this peer. Already-queued lines still flush first.
    pub fn close(&self, session: &SessionId, reason: &'static str) {
        if let Some((_, outbox)) = self.peers.remove(session) {
            let _ = outbox.try_send(OutboundFrame::Close { reason });
        }
    }
}
