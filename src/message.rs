//! WebSocket message types and close codes as defined in RFC 6455.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::protocol::OpCode;

/// WebSocket close status code per RFC 6455 Section 7.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CloseCode {
    /// Normal closure (1000).
    #[default]
    Normal,
    /// Going away (1001). Endpoint is going away (e.g., server shutdown).
    GoingAway,
    /// Protocol error (1002). Endpoint received a malformed frame.
    ProtocolError,
    /// Unsupported data (1003). Endpoint received data type it cannot handle.
    UnsupportedData,
    /// Invalid payload (1007). Message data inconsistent with its type.
    InvalidPayload,
    /// Policy violation (1008).
    PolicyViolation,
    /// Message too big (1009). Endpoint received a message too large to process.
    MessageTooBig,
    /// Mandatory extension (1010). Client expected server to negotiate an extension.
    MandatoryExtension,
    /// Internal error (1011). Server encountered an unexpected condition.
    InternalError,
    /// Any other code (3000-4999 for applications, 1012-1014 registered).
    Other(u16),
}

impl CloseCode {
    /// Create a `CloseCode` from its numeric value.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1007 => CloseCode::InvalidPayload,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1010 => CloseCode::MandatoryExtension,
            1011 => CloseCode::InternalError,
            other => CloseCode::Other(other),
        }
    }

    /// Get the numeric value of this close code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::InvalidPayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::MandatoryExtension => 1010,
            CloseCode::InternalError => 1011,
            CloseCode::Other(code) => *code,
        }
    }

    /// Check if this close code may be sent in a Close frame.
    ///
    /// Valid codes: 1000-1003, 1007-1014 and 3000-4999.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self.as_u16(), 1000..=1003 | 1007..=1014 | 3000..=4999)
    }

    /// Check if this close code is reserved and MUST NOT be sent.
    ///
    /// Reserved: 1004, 1005 (no status), 1006 (abnormal closure), 1015 (TLS).
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        matches!(self.as_u16(), 1004..=1006 | 1015)
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self::from_u16(code)
    }
}

/// A complete WebSocket message: an opcode plus its payload.
///
/// Fragmented messages are delivered reassembled, carrying the opcode of
/// their first fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    opcode: OpCode,
    payload: Vec<u8>,
}

impl Message {
    /// Create a message from an opcode and payload.
    #[must_use]
    pub fn new(opcode: OpCode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// Create a text message.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::new(OpCode::Text, s.into().into_bytes())
    }

    /// Create a text message holding `value` serialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if `value` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::text(serde_json::to_string(value)?))
    }

    /// Create a binary message.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(OpCode::Binary, data)
    }

    /// Create a ping message.
    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(OpCode::Ping, data)
    }

    /// Create a pong message.
    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(OpCode::Pong, data)
    }

    /// Create a close message whose payload is the big-endian status code.
    #[must_use]
    pub fn close(code: CloseCode) -> Self {
        Self::new(OpCode::Close, code.as_u16().to_be_bytes().to_vec())
    }

    /// The message opcode.
    #[must_use]
    pub const fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// Borrow the payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Append the payload of `other`, keeping this message's opcode.
    pub fn append(&mut self, other: &Message) {
        self.payload.extend_from_slice(&other.payload);
    }

    /// Returns `true` if this is a control message (ping, pong, or close).
    #[must_use]
    pub const fn is_control(&self) -> bool {
        self.opcode.is_control()
    }

    /// Returns `true` if this is a close message.
    #[must_use]
    pub fn is_close(&self) -> bool {
        self.opcode == OpCode::Close
    }

    /// Borrow the payload as text, if this is a text message holding UTF-8.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self.opcode {
            OpCode::Text => std::str::from_utf8(&self.payload).ok(),
            _ => None,
        }
    }

    /// Decode the payload of a text or binary message as JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` for a control message or a payload that does
    /// not parse into `T`.
    pub fn as_json<T: DeserializeOwned>(&self) -> Result<T> {
        match self.opcode {
            OpCode::Text | OpCode::Binary => Ok(serde_json::from_slice(&self.payload)?),
            other => Err(Error::Json(format!("{other} message carries no JSON"))),
        }
    }

    /// The status code of a close message, if it carries one.
    #[must_use]
    pub fn close_code(&self) -> Option<CloseCode> {
        match (self.opcode, self.payload.as_slice()) {
            (OpCode::Close, [hi, lo, ..]) => Some(CloseCode::from_u16(u16::from_be_bytes([
                *hi, *lo,
            ]))),
            _ => None,
        }
    }
}
