use std::collections::HashMap;

use tincan_core::RoomCode;

use crate::room::Room;

/// Random draws attempted before code generation gives up.
const GENERATE_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("room limit reached ({0} rooms)")]
    RoomLimit(usize),

    #[error("no unused room code after {0} attempts")]
    CodesExhausted(usize),
}

/// Owns the `code → Room` map.
///
/// Only the coordinator task touches a registry, so plain `HashMap` state
/// is enough; there is no interior locking.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
    cap: Option<usize>,
}

impl RoomRegistry {
    pub fn new(cap: Option<usize>) -> Self {
        Self {
            rooms: HashMap::new(),
            cap,
        }
    }

    fn at_capacity(&self) -> bool {
        self.cap.is_some_and(|cap| self.rooms.len() >= cap)
    }

    /// Registers a fresh empty room under a random unused code.
    pub fn generate(&mut self) -> Result<RoomCode, RegistryError> {
        if self.at_capacity() {
            return Err(RegistryError::RoomLimit(self.rooms.len()));
        }
        for _ in 0..GENERATE_ATTEMPTS {
            let code = RoomCode::generate();
            if !self.rooms.contains_key(&code) {
                self.rooms.insert(code, Room::new(code));
                return Ok(code);
            }
        }
        Err(RegistryError::CodesExhausted(GENERATE_ATTEMPTS))
    }

    /// Case-sensitive lookup.
    pub fn lookup(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn lookup_mut(&mut self, code: &RoomCode) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    /// Join-or-create: a joiner that knows a code may bring the room into
    /// existence. Creation on this path also respects the cap.
    pub fn get_or_create(&mut self, code: RoomCode) -> Result<&mut Room, RegistryError> {
        if !self.rooms.contains_key(&code) && self.at_capacity() {
            return Err(RegistryError::RoomLimit(self.rooms.len()));
        }
        Ok(self.rooms.entry(code).or_insert_with(|| Room::new(code)))
    }

    /// Unconditional removal.
    pub fn remove(&mut self, code: &RoomCode) -> Option<Room> {
        self.rooms.remove(code)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
