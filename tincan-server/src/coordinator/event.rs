use serde::Serialize;
use tokio::sync::oneshot;

use tincan_core::{RoomCode, SessionId};

use crate::registry::RegistryError;

/// Live counters reported by the health endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Stats {
    pub active_sessions: usize,
    pub active_rooms: usize,
}

/// Everything that can reach the coordinator's queue.
///
/// Transport callbacks, timer sweeps and admin requests all funnel through
/// this one channel, which is what serializes them.
#[derive(Debug)]
pub enum CoordinatorEvent {
    /// A transport session opened.
    Opened { session: SessionId },

    /// One inbound text line from a session.
    Inbound { session: SessionId, line: String },

    /// The transport session is gone. Reported exactly once per session by
    /// the transport; handling is idempotent regardless.
    Closed { session: SessionId },

    /// An empty-room grace period elapsed.
    Sweep { code: RoomCode, epoch: u64 },

    /// Admin request: register a fresh room code.
    GenerateCode {
        reply: oneshot::Sender<Result<RoomCode, RegistryError>>,
    },

    /// Admin request: report live counters.
    Snapshot { reply: oneshot::Sender<Stats> },
}
