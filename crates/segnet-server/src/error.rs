use segnet_msg::MsgError;
use segnet_transport::NetError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Net(#[from] NetError),

    #[error("message decode failed: {0}")]
    Msg(#[from] MsgError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
