//! Payload masking (RFC 6455 Section 5.3).

use crate::error::{Error, Result};

/// XOR `data` with `mask`, byte `i` with `mask[i % 4]`.
///
/// Masking is its own inverse.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    apply_mask_offset(data, mask, 0);
}

/// XOR `data` with `mask` as if `data` started `offset` bytes into the
/// payload.
///
/// Lets a payload be masked in pieces.
pub fn apply_mask_offset(data: &mut [u8], mask: [u8; 4], offset: usize) {
    let rotated = [
        mask[offset % 4],
        mask[(offset + 1) % 4],
        mask[(offset + 2) % 4],
        mask[(offset + 3) % 4],
    ];
    let mask_u32 = u32::from_ne_bytes(rotated);

    let mut chunks = data.chunks_exact_mut(4);
    for chunk in &mut chunks {
        let val = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        chunk.copy_from_slice(&(val ^ mask_u32).to_ne_bytes());
    }
    for (i, byte) in chunks.into_remainder().iter_mut().enumerate() {
        *byte ^= rotated[i];
    }
}

/// Generate a fresh masking key from the operating system's random source.
///
/// # Errors
///
/// Returns [`Error::Io`] if the random source is unavailable.
pub fn generate_mask() -> Result<[u8; 4]> {
    let mut mask = [0u8; 4];
    getrandom::getrandom(&mut mask).map_err(|e| Error::Io(e.to_string()))?;
    Ok(mask)
}
