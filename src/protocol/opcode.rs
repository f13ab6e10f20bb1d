//! WebSocket frame opcodes as defined in RFC 6455.

use std::fmt;

use crate::error::{Error, Result};

/// WebSocket frame opcode.
///
/// Defines the interpretation of the payload data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Continuation frame (0x0).
    ///
    /// Carries the next fragment of a message started by a Text or Binary frame.
    Continuation = 0x0,

    /// Text frame (0x1).
    Text = 0x1,

    /// Binary frame (0x2).
    Binary = 0x2,

    /// Close frame (0x8).
    ///
    /// Payload, when present, starts with a big-endian status code.
    Close = 0x8,

    /// Ping frame (0x9).
    Ping = 0x9,

    /// Pong frame (0xA).
    Pong = 0xA,
}

impl OpCode {
    /// Create OpCode from the low four bits of a frame's first byte.
    ///
    /// # Errors
    ///
    /// Returns `Error::ProtocolError` for reserved and unknown values.
    pub fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x0 => Ok(OpCode::Continuation),
            0x1 => Ok(OpCode::Text),
            0x2 => Ok(OpCode::Binary),
            0x8 => Ok(OpCode::Close),
            0x9 => Ok(OpCode::Ping),
            0xA => Ok(OpCode::Pong),
            _ => Err(Error::ProtocolError(format!("unknown opcode {byte:#x}"))),
        }
    }

    /// Convert OpCode to raw byte value.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this is a control frame opcode.
    ///
    /// Control frames: Close (0x8), Ping (0x9), Pong (0xA).
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }

    /// Check if this is a data frame opcode.
    #[inline]
    #[must_use]
    pub const fn is_data(self) -> bool {
        matches!(self, OpCode::Continuation | OpCode::Text | OpCode::Binary)
    }

    /// Get human-readable name for this opcode.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            OpCode::Continuation => "Continuation",
            OpCode::Text => "Text",
            OpCode::Binary => "Binary",
            OpCode::Close => "Close",
            OpCode::Ping => "Ping",
            OpCode::Pong => "Pong",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for OpCode {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        Self::from_u8(byte)
    }
}
