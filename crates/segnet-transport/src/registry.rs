//! Bounded socket registry.
//!
//! Every socket a [`crate::NetManager`] owns lives in one slot of a
//! fixed-capacity table and is addressed by an opaque [`Handle`]. Handles
//! are slot indices, so a closed slot's handle may be reused by a later
//! connection; anything that must survive slot reuse (response routing in
//! particular) keys on its own monotonic id instead.

use std::fmt;
use std::net::{TcpListener, TcpStream};

use crate::error::{NetError, Result};

/// Maximum number of sockets one registry will track.
pub const MAX_SOCKETS: usize = 1024;

/// Opaque reference to a registered socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub(crate) u32);

impl Handle {
    /// The raw slot index, for diagnostics.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Rebuild a handle from a raw slot index. Only meaningful for values
    /// previously obtained from [`Handle::raw`] on the same registry.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether operations on a socket block or return [`NetError::WouldBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    Blocking,
    NonBlocking,
}

#[derive(Debug)]
pub(crate) enum Sock {
    Listener(TcpListener),
    Stream(TcpStream),
}

#[derive(Debug)]
pub(crate) struct SockEntry {
    pub(crate) sock: Sock,
    pub(crate) mode: IoMode,
}

/// Fixed-capacity table of open sockets, filled lowest-free-slot first.
#[derive(Debug)]
pub(crate) struct SocketRegistry {
    slots: Vec<Option<SockEntry>>,
}

impl SocketRegistry {
    pub(crate) fn new() -> Self {
        let mut slots = Vec::with_capacity(MAX_SOCKETS);
        slots.resize_with(MAX_SOCKETS, || None);
        Self { slots }
    }

    /// Claim the lowest free slot. Fails with an address-in-use I/O error
    /// when the table is full.
    pub(crate) fn insert(&mut self, sock: Sock, mode: IoMode) -> Result<Handle> {
        let idx = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| {
                NetError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "socket registry full",
                ))
            })?;
        self.slots[idx] = Some(SockEntry { sock, mode });
        Ok(Handle(idx as u32))
    }

    pub(crate) fn get(&self, handle: Handle) -> Result<&SockEntry> {
        self.slots
            .get(handle.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(NetError::BadDescriptor)
    }

    pub(crate) fn get_mut(&mut self, handle: Handle) -> Result<&mut SockEntry> {
        self.slots
            .get_mut(handle.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(NetError::BadDescriptor)
    }

    /// Remove and return the entry, dropping (closing) it at the caller.
    pub(crate) fn remove(&mut self, handle: Handle) -> Result<SockEntry> {
        self.slots
            .get_mut(handle.0 as usize)
            .and_then(Option::take)
            .ok_or(NetError::BadDescriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn listener() -> Sock {
        Sock::Listener(TcpListener::bind("127.0.0.1:0").unwrap())
    }

    #[test]
    fn lowest_free_slot_reused() {
        let mut reg = SocketRegistry::new();
        let a = reg.insert(listener(), IoMode::Blocking).unwrap();
        let b = reg.insert(listener(), IoMode::Blocking).unwrap();
        assert_eq!(a, Handle(0));
        assert_eq!(b, Handle(1));

        reg.remove(a).unwrap();
        let c = reg.insert(listener(), IoMode::Blocking).unwrap();
        assert_eq!(c, Handle(0));
    }

    #[test]
    fn stale_handle_is_bad_descriptor() {
        let mut reg = SocketRegistry::new();
        let h = reg.insert(listener(), IoMode::Blocking).unwrap();
        reg.remove(h).unwrap();
        assert!(matches!(reg.get(h), Err(NetError::BadDescriptor)));
        assert!(matches!(reg.remove(h), Err(NetError::BadDescriptor)));
    }

    #[test]
    fn out_of_range_handle_is_bad_descriptor() {
        let reg = SocketRegistry::new();
        assert!(matches!(
            reg.get(Handle(MAX_SOCKETS as u32 + 5)),
            Err(NetError::BadDescriptor)
        ));
    }
}
