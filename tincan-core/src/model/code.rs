use std::fmt;
use std::str::FromStr;

use rand::Rng;

/// Characters a room code may contain: capital letters minus I/O and digits
/// minus 0/1, so codes stay unambiguous when read aloud or copied by hand.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Fixed length of every room code.
pub const CODE_LEN: usize = 6;

/// A six-character room code over [`CODE_ALPHABET`].
///
/// Parsing is strict and case-sensitive; lookups in the registry compare
/// codes exactly as the client sent them.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct RoomCode([u8; CODE_LEN]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("room code must be {CODE_LEN} characters, got {0}")]
    Length(usize),

    #[error("room code contains {0:?}, which is outside the code alphabet")]
    Alphabet(char),
}

impl RoomCode {
    /// Draws a code uniformly at random from the full code space.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut buf = [0u8; CODE_LEN];
        for slot in &mut buf {
            *slot = CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())];
        }
        Self(buf)
    }
}

impl FromStr for RoomCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != CODE_LEN {
            return Err(CodeError::Length(bytes.len()));
        }

        let mut buf = [0u8; CODE_LEN];
        for (slot, &b) in buf.iter_mut().zip(bytes) {
            if !CODE_ALPHABET.contains(&b) {
                return Err(CodeError::Alphabet(b as char));
            }
            *slot = b;
        }
        Ok(Self(buf))
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            fmt::Write::write_char(f, b as char)?;
        }
        Ok(())
    }
}
