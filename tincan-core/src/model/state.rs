use std::fmt;

/// Where a room stands in the offer/answer exchange, as observed by clients.
///
/// The value is advisory (it drives client UI) except that the server
/// gates `OFFER` on `Ready` and `ANSWER` on `Creating`.
#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq)]
pub enum CallState {
    /// No pair yet, or a peer just left. Initial and terminal.
    #[default]
    Impossible,
    /// Both peers present, no offer in flight.
    Ready,
    /// An offer has been relayed; waiting on the answer.
    Creating,
    /// The offer/answer exchange completed, or a peer signaled call start.
    Active,
}

impl CallState {
    /// Wire spelling, as carried in `STATE` lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Impossible => "Impossible",
            CallState::Ready => "Ready",
            CallState::Creating => "Creating",
            CallState::Active => "Active",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
