//! Protocol model for the tincan rendezvous server.
//!
//! Everything here is pure data: room codes, session identifiers, the call
//! state enum and the line-based wire messages. No I/O and no async; the
//! server crate owns all of that.

pub mod model;

pub use model::{
    CallState, ClientMessage, CodeError, JoinReply, ParseError, RoomCode,
    ServerMessage, SessionId, CODE_ALPHABET, CODE_LEN,
};
