//! Error types for sockets, the HTTP client and the WebSocket session.
//!
//! Transport failures are folded into a small taxonomy so callers can tell
//! "nothing to read yet" apart from "the peer is gone" and from "the peer
//! broke the framing contract".

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while establishing or driving a connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// No data is available right now. Retryable, not a failure.
    #[error("No data available")]
    NoData,

    /// The peer closed the stream or the transport broke. Terminal.
    #[error("Connection reset")]
    ConnectionReset,

    /// The peer violated the framing contract. Terminal.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The upgrade handshake was answered with something other than 101.
    #[error("Upgrade refused with HTTP status {status}")]
    Refused {
        /// Status code returned by the server.
        status: u16,
    },

    /// Hostname lookup failed.
    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    /// An endpoint string could not be parsed.
    #[error("Invalid endpoint: {0}")]
    EndpointParse(String),

    /// The TCP connection could not be established.
    #[error("Failed to establish connection: {0}")]
    EstablishConnection(String),

    /// TLS configuration or record-layer failure.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The TLS handshake failed.
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    /// The server answered 101 but the upgrade headers are wrong.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// Malformed HTTP message.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Frame size exceeds configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Declared frame size.
        size: u64,
        /// Maximum allowed size.
        max: usize,
    },

    /// A buffer ends before the frame it starts is complete.
    #[error("Incomplete frame: need {needed} more bytes")]
    IncompleteFrame {
        /// Minimum number of additional bytes required.
        needed: usize,
    },

    /// Reassembled message size exceeds configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Accumulated message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// A buffer capacity change would drop already buffered bytes.
    #[error("Invalid buffer capacity {requested} ({buffered} bytes buffered)")]
    InvalidCapacity {
        /// Requested capacity.
        requested: usize,
        /// Bytes currently held in the backlog.
        buffered: usize,
    },

    /// Close code that must not be sent on the wire.
    #[error("Invalid close code: {0}")]
    InvalidCloseCode(u16),

    /// JSON payload could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(String),

    /// Any other system I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Returns `true` if the operation may simply be retried later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Error::NoData)
    }

    /// Returns `true` if the connection cannot be used any more.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::ConnectionReset
                | Error::ProtocolError(_)
                | Error::FrameTooLarge { .. }
                | Error::MessageTooLarge { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::WouldBlock => Error::NoData,
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected => Error::ConnectionReset,
            _ => Error::Io(err.to_string()),
        }
    }
}
