//! Multiplexed command server.
//!
//! A [`CmdServer`] listens on a directory endpoint, polls its listener and
//! every client connection for readability in one loop, dispatches each
//! command to a detached worker thread, and serializes all responses
//! through a single writer thread so concurrent workers can never
//! interleave bytes on a connection.

pub mod dispatch;
pub mod error;
pub mod server;
pub mod slots;
pub mod writer;

pub use error::{Result, ServerError};
pub use server::{CmdServer, ServerConfig, ShutdownHandle, DEFAULT_RECV_BUF};
pub use slots::DEFAULT_MAX_CLIENTS;
