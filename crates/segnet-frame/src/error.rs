/// Errors that can occur while framing or deframing messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Payload length outside the allowed bounds. Detected before any I/O.
    #[error("invalid message length {len} (allowed {min}..={max})")]
    BadLength { len: usize, min: usize, max: usize },

    /// The synchronization marker did not match. Frame boundaries on this
    /// stream can no longer be trusted; the caller must close the connection.
    #[error("message stream out of sync (bad frame marker)")]
    OutOfSync,

    /// A non-blocking operation could not complete within the retry budget.
    #[error("operation would block")]
    WouldBlock,

    /// The peer closed the connection.
    #[error("end of file on connection")]
    Eof,

    /// An I/O error occurred while reading or writing a frame.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
