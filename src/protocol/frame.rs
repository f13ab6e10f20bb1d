//! WebSocket frame parsing and serialization (RFC 6455).
//!
//! Outbound frames are always final and masked. Inbound frames are decoded
//! field by field off the buffered socket by the session; [`Frame::parse`]
//! decodes a frame that is already complete in memory.

use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::OpCode;
use crate::protocol::mask::apply_mask;

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

pub(crate) const FIN_BIT: u8 = 0x80;
pub(crate) const RSV_BITS: u8 = 0x70;
pub(crate) const OPCODE_BITS: u8 = 0x0F;
pub(crate) const MASK_BIT: u8 = 0x80;
pub(crate) const LENGTH_BITS: u8 = 0x7F;

/// Number of extended length bytes announced by the 7-bit length field.
#[inline]
pub(crate) const fn extended_length_size(len7: u8) -> usize {
    match len7 {
        126 => 2,
        127 => 8,
        _ => 0,
    }
}

/// Combine the 7-bit length field with its big-endian extension.
///
/// # Errors
///
/// Returns `Error::ProtocolError` if `extended` has the wrong size or a
/// 64-bit length has its most significant bit set.
pub(crate) fn decode_length(len7: u8, extended: &[u8]) -> Result<u64> {
    match (len7, extended) {
        (0..=125, []) => Ok(u64::from(len7)),
        (126, [hi, lo]) => Ok(u64::from(u16::from_be_bytes([*hi, *lo]))),
        (127, bytes) if bytes.len() == 8 => {
            let mut be = [0u8; 8];
            be.copy_from_slice(bytes);
            let len = u64::from_be_bytes(be);
            if len >> 63 != 0 {
                return Err(Error::ProtocolError(format!(
                    "64-bit length with high bit set: {len:#x}"
                )));
            }
            Ok(len)
        }
        _ => Err(Error::ProtocolError(format!(
            "bad extended length for length field {len7}"
        ))),
    }
}

/// A WebSocket frame as defined in RFC 6455.
///
/// ## Frame Structure
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                         Masking key (if present)              |
/// +---------------------------------------------------------------+
/// |                     Payload data                              |
/// +---------------------------------------------------------------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag. True if this is the last fragment of a message.
    pub fin: bool,
    /// Reserved bits as they appear in the first byte (`0x70` mask).
    pub rsv: u8,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Whether the frame was (or will be) masked on the wire.
    pub masked: bool,
    payload: Vec<u8>,
}

impl Frame {
    /// Create a new unmasked frame.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            fin,
            rsv: 0,
            opcode,
            masked: false,
            payload: payload.into(),
        }
    }

    /// Get the (unmasked) payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Convert into a message, dropping the framing bits.
    #[must_use]
    pub fn into_message(self) -> Message {
        Message::new(self.opcode, self.payload)
    }

    /// Parse one complete frame from the start of `buf`, unmasking the
    /// payload if the frame is masked.
    ///
    /// Returns the parsed frame and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// - `Error::IncompleteFrame` if not enough data is available
    /// - `Error::ProtocolError` if the opcode is unknown
    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < 2 {
            return Err(Error::IncompleteFrame {
                needed: 2 - buf.len(),
            });
        }

        let byte0 = buf[0];
        let byte1 = buf[1];
        let opcode = OpCode::from_u8(byte0 & OPCODE_BITS)?;
        let masked = byte1 & MASK_BIT != 0;
        let len7 = byte1 & LENGTH_BITS;

        let ext_end = 2 + extended_length_size(len7);
        let header_len = if masked { ext_end + 4 } else { ext_end };
        if buf.len() < header_len {
            return Err(Error::IncompleteFrame {
                needed: header_len - buf.len(),
            });
        }

        let payload_len = decode_length(len7, &buf[2..ext_end])?;
        let payload_len = usize::try_from(payload_len).map_err(|_| Error::FrameTooLarge {
            size: payload_len,
            max: usize::MAX,
        })?;

        let total = header_len
            .checked_add(payload_len)
            .ok_or(Error::FrameTooLarge {
                size: payload_len as u64,
                max: usize::MAX - header_len,
            })?;
        if buf.len() < total {
            return Err(Error::IncompleteFrame {
                needed: total - buf.len(),
            });
        }

        let mut payload = buf[header_len..total].to_vec();
        if masked {
            let mut key = [0u8; 4];
            key.copy_from_slice(&buf[ext_end..header_len]);
            apply_mask(&mut payload, key);
        }

        let frame = Frame {
            fin: byte0 & FIN_BIT != 0,
            rsv: byte0 & RSV_BITS,
            opcode,
            masked,
            payload,
        };
        Ok((frame, total))
    }

    /// Serialize the frame.
    ///
    /// With `Some(mask)` the mask bit is set, the key follows the length
    /// and the payload is XORed with it. With `None` the frame is written
    /// unmasked.
    #[must_use]
    pub fn encode(&self, mask: Option<[u8; 4]>) -> Vec<u8> {
        let payload_len = self.payload.len();
        let mut buf = Vec::with_capacity(self.wire_size(mask.is_some()));

        let mut byte0 = self.opcode.as_u8() | (self.rsv & RSV_BITS);
        if self.fin {
            byte0 |= FIN_BIT;
        }
        buf.push(byte0);

        let mask_bit = if mask.is_some() { MASK_BIT } else { 0 };
        if payload_len <= 125 {
            buf.push(mask_bit | payload_len as u8);
        } else if let Ok(len) = u16::try_from(payload_len) {
            buf.push(mask_bit | 126);
            buf.extend_from_slice(&len.to_be_bytes());
        } else {
            buf.push(mask_bit | 127);
            buf.extend_from_slice(&(payload_len as u64).to_be_bytes());
        }

        let payload_start = match mask {
            Some(key) => {
                buf.extend_from_slice(&key);
                buf.len()
            }
            None => buf.len(),
        };
        buf.extend_from_slice(&self.payload);

        if let Some(key) = mask {
            apply_mask(&mut buf[payload_start..], key);
        }

        buf
    }

    /// Calculate the size needed to write this frame.
    #[must_use]
    pub fn wire_size(&self, masked: bool) -> usize {
        let payload_len = self.payload.len();
        let extended_len_size = if payload_len <= 125 {
            0
        } else if payload_len <= 65535 {
            2
        } else {
            8
        };
        let mask_size = if masked { 4 } else { 0 };
        2 + extended_len_size + mask_size + payload_len
    }
}

impl From<&Message> for Frame {
    fn from(msg: &Message) -> Self {
        Frame::new(true, msg.opcode(), msg.payload().to_vec())
    }
}

/// Encode `msg` as a single final frame masked with `mask`.
#[must_use]
pub fn encode_message(msg: &Message, mask: [u8; 4]) -> Vec<u8> {
    let mut frame = Frame::from(msg);
    frame.masked = true;
    frame.encode(Some(mask))
}
