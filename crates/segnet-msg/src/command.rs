use bytes::{Buf, BufMut};

use crate::error::{MsgError, Result};
use crate::header::{MsgClass, MsgHdr, CMD_TYPE, MSG_HDR_LEN, RSP_TYPE};

/// Fixed width of the command text field.
pub const MAX_CMD_LEN: usize = 256;
/// Fixed width of the response text field.
pub const MAX_RSP_LEN: usize = 256;

/// Wire size of a command message (header + fixed text).
pub const CMD_MSG_LEN: usize = MSG_HDR_LEN + MAX_CMD_LEN;
/// Wire size of a response message (header + fixed text).
pub const RSP_MSG_LEN: usize = MSG_HDR_LEN + MAX_RSP_LEN;

/// A command message: header plus a fixed 256-byte NUL-padded text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdMsg {
    pub hdr: MsgHdr,
    pub cmd: String,
}

impl CmdMsg {
    /// Build a command message. Text longer than the field holds is
    /// truncated (the field always ends in a NUL).
    pub fn new(src_id: u16, seq_no: u16, cmd: &str) -> Self {
        Self {
            hdr: MsgHdr {
                msg_id: CMD_TYPE,
                src_id,
                msg_len: CMD_MSG_LEN as u16,
                seq_no,
            },
            cmd: clamp_text(cmd, MAX_CMD_LEN - 1).to_string(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(CMD_MSG_LEN);
        self.hdr.encode(&mut wire);
        put_fixed_text(&mut wire, &self.cmd, MAX_CMD_LEN);
        wire
    }

    pub fn decode(wire: &[u8]) -> Result<Self> {
        if wire.len() < CMD_MSG_LEN {
            return Err(MsgError::Truncated {
                need: CMD_MSG_LEN,
                got: wire.len(),
            });
        }
        let mut src = wire;
        let hdr = MsgHdr::decode(&mut src)?;
        if hdr.class() != Some(MsgClass::Command) {
            return Err(MsgError::BadClass(hdr.msg_id));
        }
        let cmd = get_fixed_text(&mut src, MAX_CMD_LEN);
        Ok(Self { hdr, cmd })
    }
}

/// A response message: header plus a fixed 256-byte NUL-padded text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RspMsg {
    pub hdr: MsgHdr,
    pub rsp: String,
}

impl RspMsg {
    /// Build a response message, echoing the command's sequence number.
    pub fn new(src_id: u16, seq_no: u16, rsp: &str) -> Self {
        Self {
            hdr: MsgHdr {
                msg_id: RSP_TYPE,
                src_id,
                msg_len: RSP_MSG_LEN as u16,
                seq_no,
            },
            rsp: clamp_text(rsp, MAX_RSP_LEN - 1).to_string(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(RSP_MSG_LEN);
        self.hdr.encode(&mut wire);
        put_fixed_text(&mut wire, &self.rsp, MAX_RSP_LEN);
        wire
    }

    pub fn decode(wire: &[u8]) -> Result<Self> {
        if wire.len() < RSP_MSG_LEN {
            return Err(MsgError::Truncated {
                need: RSP_MSG_LEN,
                got: wire.len(),
            });
        }
        let mut src = wire;
        let hdr = MsgHdr::decode(&mut src)?;
        if hdr.class() != Some(MsgClass::Response) {
            return Err(MsgError::BadClass(hdr.msg_id));
        }
        let rsp = get_fixed_text(&mut src, MAX_RSP_LEN);
        Ok(Self { hdr, rsp })
    }
}

/// Clamp text to `max` bytes on a character boundary.
pub fn clamp_text(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn put_fixed_text(dst: &mut impl BufMut, text: &str, width: usize) {
    let body = clamp_text(text, width - 1).as_bytes();
    dst.put_slice(body);
    // NUL terminator plus padding out to the fixed field width.
    dst.put_bytes(0, width - body.len());
}

fn get_fixed_text(src: &mut impl Buf, width: usize) -> String {
    let mut field = vec![0u8; width];
    src.copy_to_slice(&mut field);
    let end = field.iter().position(|&b| b == 0).unwrap_or(width);
    String::from_utf8_lossy(&field[..end]).into_owned()
}
