use std::time::{Duration, Instant};

use tincan_core::{CallState, RoomCode, SessionId};

/// Maximum number of members a room will admit.
pub const ROOM_CAPACITY: usize = 2;

/// A pairing slot: at most two members, ordered by arrival (initiator
/// first, joiner second), plus the call state both of them observe.
///
/// Rooms never hold connection handles: membership is plain session ids,
/// cleared by the coordinator before a peer is discarded, so there are no
/// cycles to break.
#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    members: Vec<SessionId>,
    state: CallState,
    /// Bumped on every membership change. A pending GC sweep carries the
    /// epoch it was scheduled under and fires only if it still matches.
    epoch: u64,
    created_at: Instant,
    last_activity: Instant,
}

impl Room {
    pub fn new(code: RoomCode) -> Self {
        let now = Instant::now();
        Self {
            code,
            members: Vec::with_capacity(ROOM_CAPACITY),
            state: CallState::Impossible,
            epoch: 0,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn code(&self) -> RoomCode {
        self.code
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn members(&self) -> &[SessionId] {
        &self.members
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= ROOM_CAPACITY
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, session: &SessionId) -> bool {
        self.members.contains(session)
    }

    /// The member a relay from `session` should reach, if there is one.
    pub fn other_member(&self, session: &SessionId) -> Option<SessionId> {
        self.members.iter().copied().find(|member| member != session)
    }

    /// Admits a session. Returns `false` when the room is full or the
    /// session is already a member.
    pub fn admit(&mut self, session: SessionId) -> bool {
        if self.is_full() || self.contains(&session) {
            return false;
        }
        self.members.push(session);
        self.epoch += 1;
        self.touch();
        true
    }

    /// Removes a session. Returns `true` when it was a member.
    pub fn depart(&mut self, session: &SessionId) -> bool {
        let before = self.members.len();
        self.members.retain(|member| member != session);
        if self.members.len() == before {
            return false;
        }
        self.epoch += 1;
        self.touch();
        true
    }

    /// Replaces the state, returning the previous value.
    pub fn set_state(&mut self, next: CallState) -> CallState {
        self.touch();
        std::mem::replace(&mut self.state, next)
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time since the last membership or state change.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }
}
