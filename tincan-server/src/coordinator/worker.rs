use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tincan_core::{
    CallState, ClientMessage, JoinReply, RoomCode, ServerMessage, SessionId,
};

use crate::config::ServerConfig;
use crate::coordinator::event::{CoordinatorEvent, Stats};
use crate::coordinator::handle::CoordinatorHandle;
use crate::outbound::{PeerRegistry, SendOutcome};
use crate::registry::{RegistryError, RoomRegistry};
use crate::room::ROOM_CAPACITY;

/// Queue depth of the coordinator's event channel.
const EVENT_QUEUE_DEPTH: usize = 256;

/// The sole mutator of sessions and rooms.
///
/// Runs as a single task consuming the event queue, which serializes
/// `Opened`/`Inbound`/`Closed` with respect to each other. Handlers never
/// block on network I/O: every delivery is a `try_send` onto a peer's
/// bounded outbox, and timers are spawned sleeps that post back onto the
/// queue.
pub struct Coordinator {
    events: mpsc::Receiver<CoordinatorEvent>,
    /// Handed to spawned sweep timers so they can post back.
    events_tx: mpsc::Sender<CoordinatorEvent>,
    peers: PeerRegistry,
    /// Session table: every live session and the room it joined, if any.
    /// The peer→room edge lives here, never inside the peer.
    sessions: HashMap<SessionId, Option<RoomCode>>,
    rooms: RoomRegistry,
    room_grace: Duration,
}

impl Coordinator {
    /// Builds a coordinator plus the pieces shared with the transport.
    pub fn new(config: &ServerConfig) -> (Self, CoordinatorHandle, PeerRegistry) {
        let (events_tx, events) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let peers = PeerRegistry::new();
        let coordinator = Self {
            events,
            events_tx: events_tx.clone(),
            peers: peers.clone(),
            sessions: HashMap::new(),
            rooms: RoomRegistry::new(config.room_cap),
            room_grace: config.room_grace(),
        };
        (coordinator, CoordinatorHandle::new(events_tx), peers)
    }

    /// Consumes events until every handle is dropped.
    pub async fn run(mut self) {
        info!("coordinator event loop started");
        while let Some(event) = self.events.recv().await {
            self.dispatch(event);
        }
        info!("coordinator event loop finished");
    }

    fn dispatch(&mut self, event: CoordinatorEvent) {
        match event {
            CoordinatorEvent::Opened { session } => self.on_opened(session),
            CoordinatorEvent::Inbound { session, line } => {
                self.on_inbound(session, line)
            }
            CoordinatorEvent::Closed { session } => self.on_closed(session),
            CoordinatorEvent::Sweep { code, epoch } => self.on_sweep(code, epoch),
            CoordinatorEvent::GenerateCode { reply } => {
                let _ = reply.send(self.on_generate());
            }
            CoordinatorEvent::Snapshot { reply } => {
                let _ = reply.send(Stats {
                    active_sessions: self.sessions.len(),
                    active_rooms: self.rooms.len(),
                });
            }
        }
    }

    // --- transport events -------------------------------------------------

    fn on_opened(&mut self, session: SessionId) {
        self.sessions.insert(session, None);
        info!(%session, kind = "open", "session opened");
        self.deliver(&session, ServerMessage::WaitingForConnectionCode.encode());
    }

    fn on_inbound(&mut self, session: SessionId, line: String) {
        if !self.sessions.contains_key(&session) {
            // A line can race the session's own teardown.
            debug!(%session, "line from an unknown session");
            return;
        }

        let message = match ClientMessage::parse(&line) {
            Ok(message) => message,
            Err(error) => {
                warn!(%session, kind = "malformed", %error, "dropping malformed line");
                return;
            }
        };
        debug!(%session, verb = message.verb(), "inbound line");

        match message {
            ClientMessage::State => self.on_state_query(session),
            ClientMessage::Connection { code } => self.on_connection(session, code),
            ClientMessage::StartCall => self.on_start_call(session, line),
            ClientMessage::Offer { sdp } => self.on_offer(session, line, sdp.len()),
            ClientMessage::Answer { sdp } => self.on_answer(session, line, sdp.len()),
            ClientMessage::Ice { candidate } => {
                self.on_ice(session, line, candidate.len())
            }
        }
    }

    /// Idempotent: a forced drop may land here before the transport's own
    /// close report.
    fn on_closed(&mut self, session: SessionId) {
        let Some(joined) = self.sessions.remove(&session) else {
            return;
        };
        info!(%session, kind = "close", "session closed");

        let Some(code) = joined else { return };
        let Some(room) = self.rooms.lookup_mut(&code) else {
            return;
        };
        if !room.depart(&session) {
            return;
        }
        let remaining = room.members().len();
        let epoch = room.epoch();
        info!(%session, room = %code, kind = "leave", remaining, "peer departed");

        self.transition(&code, CallState::Impossible);
        self.broadcast_state(&code);

        if remaining == 0 {
            self.schedule_sweep(code, epoch);
        }
    }

    // --- verbs ------------------------------------------------------------

    fn on_state_query(&mut self, session: SessionId) {
        let state = self
            .joined_room_state(&session)
            .unwrap_or(CallState::Impossible);
        self.deliver(&session, ServerMessage::State(state).encode());
    }

    fn on_connection(&mut self, session: SessionId, code: RoomCode) {
        if let Some(current) = self.joined_code(&session) {
            if current == code {
                // Idempotent re-join: answer as if the first request repeated.
                info!(%session, room = %code, kind = "rejoin", "duplicate CONNECTION for the current room");
                self.deliver(
                    &session,
                    ServerMessage::ConnectionResponse(JoinReply::Connected(code))
                        .encode(),
                );
                self.broadcast_state(&code);
            } else {
                // One room per peer. The requester keeps its live connection
                // to `current`; only the stray join is refused.
                warn!(%session, room = %code, current = %current, kind = "reject", "peer is already in another room");
                self.deliver(
                    &session,
                    ServerMessage::ConnectionResponse(JoinReply::RoomFull).encode(),
                );
            }
            return;
        }

        let room = match self.rooms.get_or_create(code) {
            Ok(room) => room,
            Err(error) => {
                // The room cap also blocks implicit creation; the joiner
                // gets the same admission-failure path as a full room.
                warn!(%session, room = %code, kind = "reject", %error, "cannot create room");
                self.refuse(session);
                return;
            }
        };

        if room.is_full() {
            warn!(%session, room = %code, kind = "reject", "room is full");
            self.refuse(session);
            return;
        }

        room.admit(session);
        let members = room.members().len();
        let role = if members == 1 { "initiator" } else { "joiner" };
        self.sessions.insert(session, Some(code));
        info!(%session, room = %code, kind = "join", role, members, "peer admitted");

        self.deliver(
            &session,
            ServerMessage::ConnectionResponse(JoinReply::Connected(code)).encode(),
        );

        if members == ROOM_CAPACITY {
            self.transition(&code, CallState::Ready);
        }
        // Every member hears the (possibly unchanged) state.
        self.broadcast_state(&code);
    }

    fn on_start_call(&mut self, session: SessionId, raw: String) {
        let Some(code) = self.joined_code(&session) else {
            debug!(%session, kind = "ignored", verb = "START_CALL", "peer has no room");
            return;
        };
        let Some(room) = self.rooms.lookup(&code) else {
            return;
        };
        // Entering Active requires both members present; a solo START_CALL
        // is relayed to nobody and moves nothing.
        if room.is_full() && room.state() != CallState::Active {
            self.transition(&code, CallState::Active);
            self.broadcast_state(&code);
        }
        self.relay(&code, &session, "START_CALL", raw, 0);
    }

    fn on_offer(&mut self, session: SessionId, raw: String, sdp_len: usize) {
        let Some(code) = self.joined_code(&session) else {
            debug!(%session, kind = "ignored", verb = "OFFER", "peer has no room");
            return;
        };
        let Some(state) = self.joined_room_state(&session) else {
            return;
        };
        if state != CallState::Ready {
            warn!(%session, room = %code, %state, kind = "ignored", verb = "OFFER", "offer outside Ready");
            return;
        }
        self.transition(&code, CallState::Creating);
        self.broadcast_state(&code);
        self.relay(&code, &session, "OFFER", raw, sdp_len);
    }

    fn on_answer(&mut self, session: SessionId, raw: String, sdp_len: usize) {
        let Some(code) = self.joined_code(&session) else {
            debug!(%session, kind = "ignored", verb = "ANSWER", "peer has no room");
            return;
        };
        let Some(state) = self.joined_room_state(&session) else {
            return;
        };
        if state != CallState::Creating {
            warn!(%session, room = %code, %state, kind = "ignored", verb = "ANSWER", "answer outside Creating");
            return;
        }
        // The answer reaches the offerer before the state fan-out.
        self.relay(&code, &session, "ANSWER", raw, sdp_len);
        self.transition(&code, CallState::Active);
        self.broadcast_state(&code);
    }

    fn on_ice(&mut self, session: SessionId, raw: String, candidate_len: usize) {
        let Some(code) = self.joined_code(&session) else {
            debug!(%session, kind = "ignored", verb = "ICE", "peer has no room");
            return;
        };
        let paired = self
            .rooms
            .lookup(&code)
            .is_some_and(|room| room.is_full());
        if !paired {
            debug!(%session, room = %code, kind = "ignored", verb = "ICE", "no second member yet");
            return;
        }
        self.relay(&code, &session, "ICE", raw, candidate_len);
    }

    // --- timers and admin -------------------------------------------------

    fn on_sweep(&mut self, code: RoomCode, epoch: u64) {
        let Some(room) = self.rooms.lookup(&code) else {
            return;
        };
        if !room.is_empty() || room.epoch() != epoch {
            debug!(room = %code, kind = "sweep", "sweep superseded");
            return;
        }
        let age = room.age();
        let idle = room.idle_for();
        self.rooms.remove(&code);
        info!(room = %code, kind = "sweep", ?age, ?idle, "empty room removed");
    }

    fn on_generate(&mut self) -> Result<RoomCode, RegistryError> {
        let code = self.rooms.generate()?;
        info!(room = %code, kind = "generate", "room registered");
        // A generated room is born empty; it gets one grace period to be
        // claimed before it is swept.
        let epoch = self
            .rooms
            .lookup(&code)
            .map(|room| room.epoch())
            .unwrap_or_default();
        self.schedule_sweep(code, epoch);
        Ok(code)
    }

    /// Posts a sweep back onto the queue after the grace period. The epoch
    /// makes a stale sweep a no-op if membership changed in the meantime.
    fn schedule_sweep(&self, code: RoomCode, epoch: u64) {
        debug!(room = %code, epoch, grace = ?self.room_grace, "scheduling empty-room sweep");
        let events = self.events_tx.clone();
        let grace = self.room_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = events.send(CoordinatorEvent::Sweep { code, epoch }).await;
        });
    }

    // --- helpers ----------------------------------------------------------

    fn joined_code(&self, session: &SessionId) -> Option<RoomCode> {
        self.sessions.get(session).copied().flatten()
    }

    fn joined_room_state(&self, session: &SessionId) -> Option<CallState> {
        self.joined_code(session)
            .and_then(|code| self.rooms.lookup(&code))
            .map(|room| room.state())
    }

    /// Queues one line for a session. An overflowing outbox means the peer
    /// stopped draining: it is dropped through the same path as a close.
    fn deliver(&mut self, session: &SessionId, line: String) {
        match self.peers.send_line(session, line) {
            SendOutcome::Queued | SendOutcome::Gone => {}
            SendOutcome::Overflow => {
                warn!(%session, kind = "overflow", "outbox full, dropping peer");
                self.peers.close(session, "outbox overflow");
                self.on_closed(*session);
            }
        }
    }

    /// Replaces a room's state, logging real transitions.
    fn transition(&mut self, code: &RoomCode, next: CallState) {
        if let Some(room) = self.rooms.lookup_mut(code) {
            let previous = room.set_state(next);
            if previous != next {
                info!(room = %code, kind = "transition", from = %previous, to = %next, "room state changed");
            }
        }
    }

    /// Sends `STATE <value>` to every current member.
    fn broadcast_state(&mut self, code: &RoomCode) {
        let Some(room) = self.rooms.lookup(code) else {
            return;
        };
        let line = ServerMessage::State(room.state()).encode();
        let members: Vec<SessionId> = room.members().to_vec();
        for member in members {
            self.deliver(&member, line.clone());
        }
    }

    /// Forwards the raw inbound line to the other member, never back to the
    /// sender and never re-encoded. Payloads are logged as lengths only.
    fn relay(
        &mut self,
        code: &RoomCode,
        from: &SessionId,
        verb: &'static str,
        raw: String,
        payload_len: usize,
    ) {
        let Some(room) = self.rooms.lookup(code) else {
            return;
        };
        let Some(other) = room.other_member(from) else {
            debug!(%from, room = %code, kind = "ignored", verb, "no other member to relay to");
            return;
        };
        info!(room = %code, from = %from, to = %other, kind = "relay", verb, payload_len, "line relayed");
        self.deliver(&other, raw);
    }

    /// Admission failure: `ROOM_FULL`, then a close with a clear reason.
    /// Both frames ride the outbox, so the response reaches the wire first.
    fn refuse(&mut self, session: SessionId) {
        self.deliver(
            &session,
            ServerMessage::ConnectionResponse(JoinReply::RoomFull).encode(),
        );
        self.peers.close(&session, "cannot accept");
    }
}
