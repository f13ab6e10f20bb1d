//! WebSocket protocol core implementation (RFC 6455).

pub mod assembler;
pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;
pub mod validation;

pub use assembler::MessageAssembler;
pub use frame::{Frame, MAX_CONTROL_FRAME_PAYLOAD, encode_message};
pub use handshake::{
    WS_GUID, compute_accept_key, generate_nonce, upgrade_request, validate_upgrade_response,
};
pub use mask::{apply_mask, apply_mask_offset, generate_mask};
pub use opcode::OpCode;
pub use validation::FrameValidator;
