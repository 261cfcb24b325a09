//! Server lifecycle states.

use std::fmt;

/// Where a webserver is in its lifecycle.
///
/// `Closed` is terminal: a stopped server is never restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Listening,
    Closed,
}

impl ServerState {
    pub fn is_listening(self) -> bool {
        self == ServerState::Listening
    }

    pub fn is_closed(self) -> bool {
        self == ServerState::Closed
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Created => "created",
            ServerState::Listening => "listening",
            ServerState::Closed => "closed",
        };
        f.write_str(name)
    }
}
