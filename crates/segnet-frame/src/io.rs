use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use tracing::trace;

use crate::codec::{decode_header, encode_header, FRAME_HEADER_LEN, MAX_MSG_LEN, MIN_MSG_LEN};
use crate::error::{FrameError, Result};

/// Delay between retries of a non-blocking operation.
pub const RETRY_DELAY: Duration = Duration::from_millis(20);

/// Number of delayed retries before a non-blocking operation gives up
/// with [`FrameError::WouldBlock`].
pub const MAX_RETRIES: u32 = 10;

/// Scratch-buffer size used while discarding excess payload bytes.
const EXCESS_CHUNK: usize = 4096;

/// Send one framed message, preserving the message boundary.
///
/// Writes the frame header, then the payload. Interrupted system calls are
/// retried transparently; a zero-length write or a broken-pipe/reset
/// condition reports [`FrameError::Eof`]. On a non-blocking stream, a
/// would-block condition during the payload is retried up to [`MAX_RETRIES`]
/// times with [`RETRY_DELAY`] pauses; during the header it surfaces
/// immediately. Returns the number of payload bytes sent.
pub fn write_frame<W: Write>(stream: &mut W, payload: &[u8]) -> Result<usize> {
    let hdr = encode_header(payload.len())?;
    write_all_retry(stream, &hdr, false)?;
    write_all_retry(stream, payload, true)?;
    trace!(len = payload.len(), "frame sent");
    Ok(payload.len())
}

/// Receive one framed message into `buf`, preserving the message boundary.
///
/// Reads the fixed frame header first; a marker mismatch yields
/// [`FrameError::OutOfSync`] and the caller must close the connection. Up to
/// `buf.len()` payload bytes are then delivered; if the declared length is
/// larger, the excess is read and discarded in bounded chunks so the stream
/// stays aligned on the next frame header. Returns the number of bytes
/// placed in `buf`, or [`FrameError::Eof`] on a peer close.
pub fn read_frame<R: Read>(stream: &mut R, buf: &mut [u8]) -> Result<usize> {
    if buf.len() < MIN_MSG_LEN {
        return Err(FrameError::BadLength {
            len: buf.len(),
            min: MIN_MSG_LEN,
            max: MAX_MSG_LEN,
        });
    }

    let mut hdr = [0u8; FRAME_HEADER_LEN];
    read_exact_retry(stream, &mut hdr, false)?;
    let declared = decode_header(&hdr)?;

    let take = declared.min(buf.len());
    read_exact_retry(stream, &mut buf[..take], true)?;

    if declared > take {
        trace!(declared, take, "truncating over-long frame");
        discard_excess(stream, declared - take)?;
    }

    Ok(take)
}

fn write_all_retry<W: Write>(stream: &mut W, mut buf: &[u8], delay_retry: bool) -> Result<()> {
    let mut retries = 0u32;
    while !buf.is_empty() {
        match stream.write(buf) {
            Ok(0) => return Err(FrameError::Eof),
            Ok(n) => buf = &buf[n..],
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                if !delay_retry {
                    return Err(FrameError::WouldBlock);
                }
                retries += 1;
                if retries > MAX_RETRIES {
                    return Err(FrameError::WouldBlock);
                }
                std::thread::sleep(RETRY_DELAY);
            }
            Err(err) if is_disconnect(&err) => return Err(FrameError::Eof),
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}

fn read_exact_retry<R: Read>(stream: &mut R, mut buf: &mut [u8], delay_retry: bool) -> Result<()> {
    let mut retries = 0u32;
    while !buf.is_empty() {
        match stream.read(buf) {
            Ok(0) => return Err(FrameError::Eof),
            Ok(n) => {
                let rest = buf;
                buf = &mut rest[n..];
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                if !delay_retry {
                    return Err(FrameError::WouldBlock);
                }
                retries += 1;
                if retries > MAX_RETRIES {
                    return Err(FrameError::WouldBlock);
                }
                std::thread::sleep(RETRY_DELAY);
            }
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}

fn discard_excess<R: Read>(stream: &mut R, mut excess: usize) -> Result<()> {
    let mut scratch = [0u8; EXCESS_CHUNK];
    while excess > 0 {
        let take = excess.min(EXCESS_CHUNK);
        read_exact_retry(stream, &mut scratch[..take], true)?;
        excess -= take;
    }
    Ok(())
}

fn is_disconnect(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}
