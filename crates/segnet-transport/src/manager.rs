//! Socket lifecycle: listen, accept, connect, close, framed send/recv.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::os::fd::{AsRawFd, RawFd};
use std::thread;
use std::time::Duration;

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tracing::{debug, trace};

use segnet_frame::{read_frame, write_frame, MAX_RETRIES, RETRY_DELAY};

use crate::directory::{Directory, EndpointKind, TaskId};
use crate::error::{NetError, Result};
use crate::registry::{Handle, IoMode, Sock, SockEntry, SocketRegistry};

/// Pending-connection queue depth for listeners.
pub const LISTEN_BACKLOG: i32 = 5;

/// Owns a socket registry and a directory, and performs every lifecycle
/// and transfer operation through them.
///
/// All methods take `&mut self`; callers that share a manager across
/// threads wrap it in their own lock. There is no process-global state.
#[derive(Debug)]
pub struct NetManager {
    directory: Directory,
    registry: SocketRegistry,
}

impl NetManager {
    pub fn new(directory: Directory) -> Self {
        Self {
            directory,
            registry: SocketRegistry::new(),
        }
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Open a listening socket on the named endpoint's port.
    ///
    /// The address is marked reusable so a restarted server can rebind
    /// while old connections linger in TIME_WAIT.
    pub fn init_listener(&mut self, endpoint: &str) -> Result<Handle> {
        let port = self.directory.port_of(endpoint, EndpointKind::Tcp)?;

        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        let bind_addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], port));
        socket.bind(&bind_addr.into())?;
        socket.listen(LISTEN_BACKLOG)?;

        let listener: TcpListener = socket.into();
        let handle = self
            .registry
            .insert(Sock::Listener(listener), IoMode::Blocking)?;
        debug!(%handle, endpoint, port, "listener open");
        Ok(handle)
    }

    /// Accept one pending connection on a listener.
    ///
    /// The accepted stream gets zero-timeout linger (close discards unsent
    /// data immediately) and Nagle disabled, and starts out blocking. With
    /// the listener in non-blocking mode and nothing pending this returns
    /// [`NetError::WouldBlock`] without waiting.
    pub fn accept(&mut self, listener: Handle) -> Result<Handle> {
        let entry = self.registry.get(listener)?;
        let Sock::Listener(sock) = &entry.sock else {
            return Err(NetError::BadDescriptor);
        };

        let (stream, peer) = match sock.accept() {
            Ok(pair) => pair,
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Err(NetError::WouldBlock),
            Err(e) => return Err(NetError::Io(e)),
        };

        let sref = SockRef::from(&stream);
        sref.set_linger(Some(Duration::ZERO))?;
        stream.set_nodelay(true)?;
        stream.set_nonblocking(false)?;

        let handle = self
            .registry
            .insert(Sock::Stream(stream), IoMode::Blocking)?;
        debug!(%handle, %peer, "accepted connection");
        Ok(handle)
    }

    /// Connect to a named endpoint on `host`, binding the fixed source
    /// port assigned to `task` (task 0 binds ephemeral) so the server can
    /// identify the caller from the peer address.
    ///
    /// In non-blocking mode an in-progress connect is re-polled on the
    /// frame retry schedule; if it still has not completed the socket is
    /// dropped and [`NetError::WouldBlock`] returned.
    pub fn connect(
        &mut self,
        endpoint: &str,
        host: &str,
        task: TaskId,
        mode: IoMode,
    ) -> Result<Handle> {
        let port = self.directory.port_of(endpoint, EndpointKind::Tcp)?;
        let src_port = self.directory.client_port(task)?;

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|_| NetError::BadHost(host.to_string()))?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| NetError::BadHost(host.to_string()))?;

        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        let bind_addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], src_port));
        socket.bind(&bind_addr.into())?;
        if mode == IoMode::NonBlocking {
            socket.set_nonblocking(true)?;
        }

        let mut attempts = 0;
        loop {
            match socket.connect(&addr.into()) {
                Ok(()) => break,
                Err(e) => match e.raw_os_error() {
                    Some(libc::EISCONN) => break,
                    Some(libc::EINPROGRESS) | Some(libc::EALREADY) => {
                        if attempts >= MAX_RETRIES {
                            return Err(NetError::WouldBlock);
                        }
                        attempts += 1;
                        trace!(attempts, %addr, "connect in progress");
                        thread::sleep(RETRY_DELAY);
                    }
                    _ if e.kind() == ErrorKind::Interrupted => continue,
                    _ => return Err(NetError::Io(e)),
                },
            }
        }
        socket.set_nodelay(true)?;

        let stream: TcpStream = socket.into();
        let handle = self.registry.insert(Sock::Stream(stream), mode)?;
        debug!(%handle, endpoint, %addr, src_port, "connected");
        Ok(handle)
    }

    /// Close and unregister a socket.
    pub fn close(&mut self, handle: Handle) -> Result<()> {
        let entry = self.registry.remove(handle)?;
        drop(entry);
        debug!(%handle, "closed");
        Ok(())
    }

    /// Switch a stream between blocking and non-blocking I/O. No-op when
    /// the mode already matches.
    pub fn set_io_mode(&mut self, handle: Handle, mode: IoMode) -> Result<()> {
        let entry = self.registry.get_mut(handle)?;
        if entry.mode == mode {
            return Ok(());
        }
        let nonblocking = mode == IoMode::NonBlocking;
        match &entry.sock {
            Sock::Listener(l) => l.set_nonblocking(nonblocking)?,
            Sock::Stream(s) => s.set_nonblocking(nonblocking)?,
        }
        entry.mode = mode;
        Ok(())
    }

    /// Identify the peer of a connected stream: the task behind its source
    /// port (per the directory tables) and its address as a string.
    pub fn peer_identity(&self, handle: Handle) -> Result<(TaskId, String)> {
        let entry = self.registry.get(handle)?;
        let Sock::Stream(stream) = &entry.sock else {
            return Err(NetError::BadDescriptor);
        };
        let peer = stream.peer_addr()?;
        let task = self.directory.task_for_port(peer.port());
        Ok((task, peer.ip().to_string()))
    }

    /// Send one framed message on a connected stream.
    pub fn send(&mut self, handle: Handle, payload: &[u8]) -> Result<usize> {
        let entry = self.registry.get_mut(handle)?;
        let Sock::Stream(stream) = &mut entry.sock else {
            return Err(NetError::BadDescriptor);
        };
        Ok(write_frame(stream, payload)?)
    }

    /// Receive one framed message into `buf`, returning the payload length
    /// actually stored (oversized payloads are truncated to fit).
    pub fn recv(&mut self, handle: Handle, buf: &mut [u8]) -> Result<usize> {
        let entry = self.registry.get_mut(handle)?;
        let Sock::Stream(stream) = &mut entry.sock else {
            return Err(NetError::BadDescriptor);
        };
        Ok(read_frame(stream, buf)?)
    }

    pub fn local_addr(&self, handle: Handle) -> Result<SocketAddr> {
        let entry = self.registry.get(handle)?;
        let addr = match &entry.sock {
            Sock::Listener(l) => l.local_addr()?,
            Sock::Stream(s) => s.local_addr()?,
        };
        Ok(addr)
    }

    pub fn raw_fd(&self, handle: Handle) -> Result<RawFd> {
        let entry = self.registry.get(handle)?;
        let fd = match &entry.sock {
            Sock::Listener(l) => l.as_raw_fd(),
            Sock::Stream(s) => s.as_raw_fd(),
        };
        Ok(fd)
    }

    /// Duplicate a connected stream's descriptor, e.g. to hand the write
    /// side to a dedicated writer thread.
    pub fn clone_stream(&self, handle: Handle) -> Result<TcpStream> {
        let entry = self.registry.get(handle)?;
        let Sock::Stream(stream) = &entry.sock else {
            return Err(NetError::BadDescriptor);
        };
        Ok(stream.try_clone()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Directory, EndpointEntry, EndpointKind, ANY_TASK};

    fn test_directory() -> (Directory, String) {
        // Grab a free port, then build a one-entry table around it.
        let probe = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);
        let dir = Directory::new(
            vec![EndpointEntry {
                name: "test_srv".to_string(),
                kind: EndpointKind::Tcp,
                task: 42,
                port,
            }],
            vec![(ANY_TASK, 0)],
        );
        (dir, "test_srv".to_string())
    }

    #[test]
    fn loopback_roundtrip() {
        let (dir, srv) = test_directory();
        let mut server = NetManager::new(dir.clone());
        let mut client = NetManager::new(dir);

        let listener = server.init_listener(&srv).unwrap();
        let conn = client
            .connect(&srv, "127.0.0.1", ANY_TASK, IoMode::Blocking)
            .unwrap();
        let accepted = server.accept(listener).unwrap();

        client.send(conn, b"hello").unwrap();
        let mut buf = [0u8; 64];
        let n = server.recv(accepted, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");

        server.send(accepted, b"world").unwrap();
        let n = client.recv(conn, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"world");
    }

    #[test]
    fn unknown_endpoint_and_host() {
        let (dir, _) = test_directory();
        let mut mgr = NetManager::new(dir);
        assert!(matches!(
            mgr.init_listener("nope"),
            Err(NetError::BadEndpoint(_))
        ));
        assert!(matches!(
            mgr.connect("test_srv", "no.such.host.invalid", ANY_TASK, IoMode::Blocking),
            Err(NetError::BadHost(_))
        ));
    }

    #[test]
    fn unknown_task_rejected_before_io() {
        let (dir, srv) = test_directory();
        let mut mgr = NetManager::new(dir);
        assert!(matches!(
            mgr.connect(&srv, "127.0.0.1", 999, IoMode::Blocking),
            Err(NetError::BadProcess(999))
        ));
    }

    #[test]
    fn closed_handle_is_bad_descriptor() {
        let (dir, srv) = test_directory();
        let mut mgr = NetManager::new(dir);
        let listener = mgr.init_listener(&srv).unwrap();
        mgr.close(listener).unwrap();
        assert!(matches!(mgr.close(listener), Err(NetError::BadDescriptor)));
        assert!(matches!(mgr.accept(listener), Err(NetError::BadDescriptor)));
    }

    #[test]
    fn nonblocking_accept_returns_wouldblock() {
        let (dir, srv) = test_directory();
        let mut server = NetManager::new(dir);
        let listener = server.init_listener(&srv).unwrap();
        server.set_io_mode(listener, IoMode::NonBlocking).unwrap();
        assert!(matches!(server.accept(listener), Err(NetError::WouldBlock)));
    }

    #[test]
    fn peer_identity_reports_ip() {
        let (dir, srv) = test_directory();
        let mut server = NetManager::new(dir.clone());
        let mut client = NetManager::new(dir);

        let listener = server.init_listener(&srv).unwrap();
        let _conn = client
            .connect(&srv, "127.0.0.1", ANY_TASK, IoMode::Blocking)
            .unwrap();
        let accepted = server.accept(listener).unwrap();

        let (task, host) = server.peer_identity(accepted).unwrap();
        assert_eq!(task, ANY_TASK);
        assert_eq!(host, "127.0.0.1");
    }

    #[test]
    fn send_on_listener_is_bad_descriptor() {
        let (dir, srv) = test_directory();
        let mut mgr = NetManager::new(dir);
        let listener = mgr.init_listener(&srv).unwrap();
        assert!(matches!(
            mgr.send(listener, b"x"),
            Err(NetError::BadDescriptor)
        ));
    }
}
