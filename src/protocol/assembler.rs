//! Message reassembly for fragmented WebSocket messages (RFC 6455).

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::{Frame, OpCode};

/// Reassembles fragmented WebSocket messages.
///
/// The partial message survives between calls, so a session can stop
/// reading in the middle of a fragmented message and resume later.
#[derive(Debug)]
pub struct MessageAssembler {
    partial: Option<Message>,
    fragment_count: usize,
    limits: Limits,
}

impl MessageAssembler {
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            partial: None,
            fragment_count: 0,
            limits,
        }
    }

    /// Add a frame to the message being assembled.
    ///
    /// Returns `Some(message)` when a message is complete. Control frames
    /// complete immediately and leave a partial data message untouched.
    ///
    /// # Errors
    ///
    /// - `Error::ProtocolError` for a continuation without a start, a new
    ///   data message while another is incomplete, or too many fragments
    /// - `Error::MessageTooLarge` if the message exceeds the size limit
    pub fn push(&mut self, frame: Frame) -> Result<Option<Message>> {
        if frame.opcode.is_control() {
            return Ok(Some(frame.into_message()));
        }

        let result = self.push_data(frame);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn push_data(&mut self, frame: Frame) -> Result<Option<Message>> {
        let fin = frame.fin;

        if frame.opcode == OpCode::Continuation {
            let Some(message) = self.partial.as_mut() else {
                return Err(Error::ProtocolError(
                    "continuation frame without a message to continue".into(),
                ));
            };
            self.limits
                .check_fragment_count(self.fragment_count + 1)?;
            let new_size = message.payload().len() + frame.payload().len();
            self.limits.check_message_size(new_size)?;
            message.append(&frame.into_message());
        } else {
            if self.partial.is_some() {
                return Err(Error::ProtocolError(format!(
                    "{} frame while a fragmented message is incomplete",
                    frame.opcode
                )));
            }
            self.limits.check_message_size(frame.payload().len())?;
            self.partial = Some(frame.into_message());
        }
        self.fragment_count += 1;

        if fin {
            self.fragment_count = 0;
            Ok(self.partial.take())
        } else {
            Ok(None)
        }
    }

    /// Returns `true` while a fragmented message is incomplete.
    #[must_use]
    pub const fn is_assembling(&self) -> bool {
        self.partial.is_some()
    }

    /// Drop any partial message.
    pub fn reset(&mut self) {
        self.partial = None;
        self.fragment_count = 0;
    }
}
