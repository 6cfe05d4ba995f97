//! Application message layouts shared by every segnet component.
//!
//! The 8-byte message header travels in network byte order. The high byte
//! of `msg_id` carries the message class (command, response, log, data);
//! data messages refine it with a [`DataId`]. Command and response messages
//! carry a fixed 256-byte NUL-padded text field; over-long text is
//! truncated, never rejected.

pub mod command;
pub mod error;
pub mod header;

pub use command::{
    clamp_text, CmdMsg, RspMsg, CMD_MSG_LEN, MAX_CMD_LEN, MAX_RSP_LEN, RSP_MSG_LEN,
};
pub use error::{MsgError, Result};
pub use header::{
    DataId, MsgClass, MsgHdr, CMD_TYPE, DATA_TYPE, LOG_TYPE, MSG_HDR_LEN, RSP_TYPE,
};
