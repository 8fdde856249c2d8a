//! The line codec: one wire frame is one line of the form `VERB[ PAYLOAD]`.
//!
//! Inbound lines parse into [`ClientMessage`]; server-originated lines are
//! encoded from [`ServerMessage`]. Relays (`OFFER`/`ANSWER`/`ICE`/
//! `START_CALL` between members) reuse the raw inbound line and never pass
//! through the encoder, so SDP and candidate payloads are forwarded
//! byte-for-byte.

use crate::model::code::{CodeError, RoomCode};
use crate::model::state::CallState;

/// A parsed inbound line from a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `STATE`: query the current room state.
    State,
    /// `CONNECTION <code>`: join, or implicitly create, a room.
    Connection { code: RoomCode },
    /// `START_CALL`: the sender is about to begin media negotiation.
    StartCall,
    /// `OFFER <sdp>`: opaque SDP, relayed verbatim to the other member.
    Offer { sdp: String },
    /// `ANSWER <sdp>`: opaque SDP, relayed verbatim to the other member.
    Answer { sdp: String },
    /// `ICE <candidate>`: opaque candidate, relayed verbatim.
    Ice { candidate: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("unknown verb {0:?}")]
    UnknownVerb(String),

    #[error("{verb} requires a payload")]
    MissingPayload { verb: &'static str },

    #[error("invalid room code: {0}")]
    BadCode(#[from] CodeError),
}

impl ClientMessage {
    /// Parses one inbound line.
    ///
    /// The first whitespace-delimited token is the verb (compared after
    /// uppercasing); the remainder, with leading whitespace stripped, is the
    /// payload. A trailing space after an empty-payload verb is accepted.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let (verb, payload) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim_start()),
            None => (line, ""),
        };
        if verb.is_empty() {
            return Err(ParseError::Empty);
        }

        match verb.to_ascii_uppercase().as_str() {
            "STATE" => Ok(ClientMessage::State),
            "START_CALL" => Ok(ClientMessage::StartCall),
            "CONNECTION" => {
                let payload = require_payload(payload, "CONNECTION")?;
                Ok(ClientMessage::Connection {
                    code: payload.parse()?,
                })
            }
            "OFFER" => Ok(ClientMessage::Offer {
                sdp: require_payload(payload, "OFFER")?.to_owned(),
            }),
            "ANSWER" => Ok(ClientMessage::Answer {
                sdp: require_payload(payload, "ANSWER")?.to_owned(),
            }),
            "ICE" => Ok(ClientMessage::Ice {
                candidate: require_payload(payload, "ICE")?.to_owned(),
            }),
            _ => Err(ParseError::UnknownVerb(verb.to_owned())),
        }
    }

    /// The verb this message arrived under, for logging.
    pub fn verb(&self) -> &'static str {
        match self {
            ClientMessage::State => "STATE",
            ClientMessage::Connection { .. } => "CONNECTION",
            ClientMessage::StartCall => "START_CALL",
            ClientMessage::Offer { .. } => "OFFER",
            ClientMessage::Answer { .. } => "ANSWER",
            ClientMessage::Ice { .. } => "ICE",
        }
    }
}

fn require_payload<'a>(
    payload: &'a str,
    verb: &'static str,
) -> Result<&'a str, ParseError> {
    if payload.is_empty() {
        Err(ParseError::MissingPayload { verb })
    } else {
        Ok(payload)
    }
}

/// Result of a `CONNECTION` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinReply {
    /// The peer is now (or already was) a member of the room.
    Connected(RoomCode),
    /// The room cannot accept the peer.
    RoomFull,
}

/// An outbound line originated by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Unsolicited hint sent once per connection, prompting `CONNECTION`.
    WaitingForConnectionCode,
    /// Current room state, sent on query and on every broadcast.
    State(CallState),
    /// Outcome of a `CONNECTION` request.
    ConnectionResponse(JoinReply),
}

impl ServerMessage {
    pub fn encode(&self) -> String {
        match self {
            ServerMessage::WaitingForConnectionCode => {
                "WAITING_FOR_CONNECTION_CODE".to_owned()
            }
            ServerMessage::State(state) => format!("STATE {state}"),
            ServerMessage::ConnectionResponse(JoinReply::Connected(code)) => {
                format!("CONNECTION_RESPONSE CONNECTED {code}")
            }
            ServerMessage::ConnectionResponse(JoinReply::RoomFull) => {
                "CONNECTION_RESPONSE ROOM_FULL".to_owned()
            }
        }
    }
}
