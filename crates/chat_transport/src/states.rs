//! Link states - connection lifecycle of one transport adapter

use serde::{Deserialize, Serialize};

/// Connection state of a transport adapter.
///
/// Legal transitions:
/// `Idle -> Connecting -> Connected -> Disconnected`, plus
/// `Connecting -> Idle` (initial connect failed) and
/// `Connected -> Connecting` (reconnect after an unsolicited drop).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// Never connected.
    Idle,
    /// Connect or reconnect in flight.
    Connecting,
    /// Live; the join signal has been emitted.
    Connected,
    /// Dropped and not coming back (explicit disconnect or retries spent).
    Disconnected,
}

impl Default for LinkState {
    fn default() -> Self {
        LinkState::Idle
    }
}

impl LinkState {
    /// Whether moving to `next` is a legal transition.
    pub fn can_move_to(&self, next: LinkState) -> bool {
        use LinkState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Connected)
                | (Connecting, Idle)
                | (Connecting, Disconnected)
                | (Connected, Connecting)
                | (Connected, Disconnected)
        )
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// States in which `connect()` short-circuits.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}
