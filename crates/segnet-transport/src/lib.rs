//! Connection lifecycle management over a bounded socket registry.
//!
//! A [`NetManager`] owns every socket it creates, addressed by opaque
//! [`Handle`]s: it resolves endpoint names through the static [`Directory`],
//! opens listeners, accepts and initiates connections, toggles I/O modes,
//! and funnels all framed send/receive traffic through descriptor
//! validation. Multiple managers can coexist; there is no global state.

pub mod directory;
pub mod error;
pub mod manager;
pub mod poll;
pub mod registry;

pub use directory::{
    Directory, EndpointEntry, EndpointKind, TaskId, ANY_TASK, LSEB_CMD_SRV, LSEB_CMD_TASK,
    MAX_TASKS,
};
pub use error::{NetError, Result};
pub use manager::{NetManager, LISTEN_BACKLOG};
pub use poll::{PollReadiness, Readiness};
pub use registry::{Handle, IoMode, MAX_SOCKETS};
