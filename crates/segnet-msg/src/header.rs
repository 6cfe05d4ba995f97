use bytes::{Buf, BufMut};

use crate::error::{MsgError, Result};

/// Wire size of [`MsgHdr`].
pub const MSG_HDR_LEN: usize = 8;

/// Command message class, shifted into the high byte of `msg_id`.
pub const CMD_TYPE: u16 = 1 << 8;
/// Response message class.
pub const RSP_TYPE: u16 = 2 << 8;
/// Log message class.
pub const LOG_TYPE: u16 = 3 << 8;
/// Data message class.
pub const DATA_TYPE: u16 = 4 << 8;

/// Coarse message class carried in the high byte of `msg_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgClass {
    Command,
    Response,
    Log,
    Data,
}

impl MsgClass {
    /// Extract the class from a raw `msg_id`, if it is a known one.
    pub fn from_msg_id(msg_id: u16) -> Option<Self> {
        match msg_id & 0xFF00 {
            CMD_TYPE => Some(MsgClass::Command),
            RSP_TYPE => Some(MsgClass::Response),
            LOG_TYPE => Some(MsgClass::Log),
            DATA_TYPE => Some(MsgClass::Data),
            _ => None,
        }
    }
}

/// Finer data-message kinds carried in the low byte of a `DATA_TYPE` id.
///
/// The payload schemas behind these ids are opaque to the transport core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DataId {
    /// Segment status report.
    SegStatus = DATA_TYPE + 1,
    /// Raw pass-through block for the internal devices test interface.
    Raw,
    /// Warping-harness strain telemetry.
    WhStrain,
    /// Warping-harness calibration telemetry.
    WhCalib,
    /// Sensor configuration.
    SensConfig,
    /// Actuator configuration.
    ActConfig,
    /// Segment realtime samples.
    SegRealtime,
    /// Actuator realtime targets.
    ActRealtime,
}

/// Message header, 8 bytes in network byte order on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgHdr {
    /// Message type: class in the high byte, kind in the low byte.
    pub msg_id: u16,
    /// Sender application (task) id.
    pub src_id: u16,
    /// Total message length including this header, in bytes.
    pub msg_len: u16,
    /// Caller-assigned sequence number, echoed from command to response.
    pub seq_no: u16,
}

impl MsgHdr {
    /// The coarse class of this message, if recognized.
    pub fn class(&self) -> Option<MsgClass> {
        MsgClass::from_msg_id(self.msg_id)
    }

    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u16(self.msg_id);
        dst.put_u16(self.src_id);
        dst.put_u16(self.msg_len);
        dst.put_u16(self.seq_no);
    }

    pub fn decode(src: &mut impl Buf) -> Result<Self> {
        if src.remaining() < MSG_HDR_LEN {
            return Err(MsgError::Truncated {
                need: MSG_HDR_LEN,
                got: src.remaining(),
            });
        }
        Ok(Self {
            msg_id: src.get_u16(),
            src_id: src.get_u16(),
            msg_len: src.get_u16(),
            seq_no: src.get_u16(),
        })
    }
}
