//! Validation of inbound frame headers (RFC 6455).
//!
//! A client enforces:
//! - no masking on server frames (Section 5.1)
//! - RSV bits clear, since no extension is ever negotiated (Section 5.2)
//! - control frames final and at most 125 bytes (Section 5.5)
//! - frame size limits

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::frame::MAX_CONTROL_FRAME_PAYLOAD;

/// Validator for frames received from the server.
#[derive(Debug, Clone)]
pub struct FrameValidator {
    limits: Limits,
}

impl FrameValidator {
    /// Create a new frame validator.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// Validate the bits of a frame's first byte.
    ///
    /// # Errors
    ///
    /// Returns `Error::ProtocolError` if any RSV bit is set.
    pub fn validate_rsv_bits(&self, rsv: u8) -> Result<()> {
        if rsv != 0 {
            return Err(Error::ProtocolError(format!(
                "reserved bits set without a negotiated extension: {rsv:#04x}"
            )));
        }
        Ok(())
    }

    /// Validate the mask bit of a server frame.
    ///
    /// # Errors
    ///
    /// Returns `Error::ProtocolError` if the frame is masked.
    pub fn validate_masking(&self, masked: bool) -> Result<()> {
        if masked {
            return Err(Error::ProtocolError("server sent a masked frame".into()));
        }
        Ok(())
    }

    /// Validate a frame's declared length given its opcode and FIN bit.
    ///
    /// # Errors
    ///
    /// - `Error::ProtocolError` for a fragmented or oversized control frame
    /// - `Error::FrameTooLarge` if the length exceeds the frame size limit
    pub fn validate_length(&self, opcode: OpCode, fin: bool, payload_len: u64) -> Result<()> {
        if opcode.is_control() {
            if !fin {
                return Err(Error::ProtocolError(format!(
                    "fragmented {opcode} frame"
                )));
            }
            if payload_len > MAX_CONTROL_FRAME_PAYLOAD as u64 {
                return Err(Error::ProtocolError(format!(
                    "{opcode} frame payload too large: {payload_len}"
                )));
            }
        }
        self.limits.check_frame_size(payload_len)
    }
}
