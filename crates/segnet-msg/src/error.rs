/// Errors that can occur while decoding application messages.
#[derive(Debug, thiserror::Error)]
pub enum MsgError {
    /// The buffer is too short for the expected layout.
    #[error("message too short ({got} bytes, need {need})")]
    Truncated { need: usize, got: usize },

    /// The message id does not carry the expected class.
    #[error("unexpected message class in msgId {0:#06x}")]
    BadClass(u16),
}

pub type Result<T> = std::result::Result<T, MsgError>;
