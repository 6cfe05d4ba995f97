use bytes::{Buf, BufMut};

use crate::error::{FrameError, Result};

/// Frame header: sync marker (4) + payload length (4), network byte order.
pub const FRAME_HEADER_LEN: usize = 8;

/// Synchronization marker, the ASCII bytes `<TT>`.
pub const SYNC_MARKER: u32 = 0x3C54_543E;

/// Minimum payload length.
pub const MIN_MSG_LEN: usize = 1;

/// Maximum payload length (a little over 4 MiB).
pub const MAX_MSG_LEN: usize = 4097 * 1024;

/// Validate a payload length against the declared bounds.
pub fn check_length(len: usize) -> Result<()> {
    if len < MIN_MSG_LEN || len > MAX_MSG_LEN {
        return Err(FrameError::BadLength {
            len,
            min: MIN_MSG_LEN,
            max: MAX_MSG_LEN,
        });
    }
    Ok(())
}

/// Encode a frame header for a payload of `payload_len` bytes.
///
/// Fails with [`FrameError::BadLength`] before producing anything when the
/// length is out of bounds.
pub fn encode_header(payload_len: usize) -> Result<[u8; FRAME_HEADER_LEN]> {
    check_length(payload_len)?;
    let mut hdr = [0u8; FRAME_HEADER_LEN];
    let mut cur = &mut hdr[..];
    cur.put_u32(SYNC_MARKER);
    cur.put_u32(payload_len as u32);
    Ok(hdr)
}

/// Decode a frame header, returning the declared payload length.
///
/// A marker mismatch means the stream is no longer frame-aligned and yields
/// [`FrameError::OutOfSync`]. The declared length is *not* bounds-checked
/// here: an over-long payload is handled by the truncate-and-resync policy
/// in [`crate::io::read_frame`].
pub fn decode_header(hdr: &[u8; FRAME_HEADER_LEN]) -> Result<usize> {
    let mut cur = &hdr[..];
    if cur.get_u32() != SYNC_MARKER {
        return Err(FrameError::OutOfSync);
    }
    Ok(cur.get_u32() as usize)
}
