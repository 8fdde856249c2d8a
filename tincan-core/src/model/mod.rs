mod code;
mod message;
mod session;
mod state;

pub use code::{CodeError, RoomCode, CODE_ALPHABET, CODE_LEN};
pub use message::{ClientMessage, JoinReply, ParseError, ServerMessage};
pub use session::SessionId;
pub use state::CallState;
