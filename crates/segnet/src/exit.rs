use std::fmt;

use segnet_msg::MsgError;
use segnet_server::ServerError;
use segnet_transport::NetError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const BAD_ENDPOINT: i32 = 3;
pub const BAD_DESCRIPTOR: i32 = 4;
pub const BAD_HOST: i32 = 5;
pub const BAD_LENGTH: i32 = 6;
pub const BAD_PROCESS: i32 = 8;
pub const OUT_OF_SYNC: i32 = 9;
pub const DATA_INVALID: i32 = 60;
#[allow(dead_code)]
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn net_error(context: &str, err: NetError) -> CliError {
    let code = match &err {
        NetError::BadDescriptor => BAD_DESCRIPTOR,
        NetError::BadEndpoint(_) => BAD_ENDPOINT,
        NetError::BadHost(_) => BAD_HOST,
        NetError::BadProcess(_) => BAD_PROCESS,
        NetError::BadLength { .. } => BAD_LENGTH,
        NetError::OutOfSync => OUT_OF_SYNC,
        NetError::WouldBlock => TIMEOUT,
        NetError::Eof => FAILURE,
        NetError::Io(_) => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn msg_error(context: &str, err: MsgError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn server_error(context: &str, err: ServerError) -> CliError {
    match err {
        ServerError::Net(err) => net_error(context, err),
        ServerError::Msg(err) => msg_error(context, err),
        ServerError::Io(err) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
