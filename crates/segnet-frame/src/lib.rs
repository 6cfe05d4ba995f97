//! Message-boundary-preserving framing over byte streams.
//!
//! Every application message travels inside a frame:
//! - A 4-byte synchronization marker (`<TT>`) for out-of-sync detection
//! - A 4-byte network-byte-order payload length
//! - Exactly `length` payload bytes
//!
//! A receiver whose buffer is smaller than the incoming payload gets the
//! prefix that fits; the excess is read and discarded so the stream stays
//! frame-aligned (truncate-and-resync, by contract).

pub mod codec;
pub mod error;
pub mod io;

pub use codec::{
    decode_header, encode_header, FRAME_HEADER_LEN, MAX_MSG_LEN, MIN_MSG_LEN, SYNC_MARKER,
};
pub use error::{FrameError, Result};
pub use io::{read_frame, write_frame, MAX_RETRIES, RETRY_DELAY};
