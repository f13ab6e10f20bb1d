//! Lifecycle states of a WebSocket session.

use std::fmt;

/// WebSocket session state.
///
/// A session moves strictly forward: `Connecting -> Open -> Closing ->
/// Closed`. A session object only exists once the upgrade has succeeded,
/// so it is never observed in `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// The upgrade handshake is in progress.
    #[default]
    Connecting,
    /// Messages flow in both directions.
    Open,
    /// Our Close frame is sent; waiting for the peer's.
    Closing,
    /// The transport is released. Every operation reports a reset.
    Closed,
}

impl ConnectionState {
    /// Returns `true` unless the session is `Closed`.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }

    /// Returns `true` if messages may be sent.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Returns `true` if frames may still arrive.
    #[must_use]
    #[inline]
    pub const fn can_receive(&self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::Closing)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}
