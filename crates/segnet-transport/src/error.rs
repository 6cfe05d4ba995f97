use segnet_frame::FrameError;

/// Errors that can occur in lifecycle and transport operations.
///
/// `Bad*` kinds are validation failures detected before any I/O and are
/// never retried. `WouldBlock` surfaces only once the internal retry budget
/// is exhausted. `Eof` is an expected termination signal, not a fault.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The handle does not reference a live registry entry.
    #[error("invalid socket descriptor")]
    BadDescriptor,

    /// The endpoint name is not in the directory.
    #[error("invalid endpoint name: {0}")]
    BadEndpoint(String),

    /// The hostname could not be resolved to an address.
    #[error("invalid host name: {0}")]
    BadHost(String),

    /// The task id has no entry in the port tables.
    #[error("invalid process/task id: {0}")]
    BadProcess(u16),

    /// Payload or buffer length outside the allowed bounds.
    #[error("invalid message length {len} (allowed {min}..={max})")]
    BadLength { len: usize, min: usize, max: usize },

    /// The message stream lost frame alignment; the connection must close.
    #[error("message stream out of sync")]
    OutOfSync,

    /// A non-blocking operation could not complete within the retry budget.
    #[error("operation would block")]
    WouldBlock,

    /// The peer closed the connection.
    #[error("end of file on connection")]
    Eof,

    /// An underlying system call failed.
    #[error("system error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FrameError> for NetError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::BadLength { len, min, max } => NetError::BadLength { len, min, max },
            FrameError::OutOfSync => NetError::OutOfSync,
            FrameError::WouldBlock => NetError::WouldBlock,
            FrameError::Eof => NetError::Eof,
            FrameError::Io(io) => NetError::Io(io),
        }
    }
}

pub type Result<T> = std::result::Result<T, NetError>;
