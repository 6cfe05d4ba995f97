//! The accept/receive loop.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use segnet_msg::{CmdMsg, MsgClass, MsgHdr};
use segnet_transport::{
    Directory, EndpointKind, Handle, IoMode, NetError, NetManager, PollReadiness, Readiness,
    TaskId, LSEB_CMD_SRV,
};

use crate::dispatch::dispatch_command;
use crate::error::Result;
use crate::slots::{ClientSlot, SlotTable, DEFAULT_MAX_CLIENTS};
use crate::writer::{self, WriterMsg};

/// Default receive buffer size. Command messages fit with room to spare;
/// larger payloads are truncated by the framing layer.
pub const DEFAULT_RECV_BUF: usize = 1024;

/// Server tuning knobs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory endpoint to listen on.
    pub endpoint: String,
    /// Maximum simultaneous clients; later connections are turned away.
    pub max_clients: usize,
    /// Receive buffer size per message.
    pub recv_buf: usize,
    /// Poll timeout, which bounds shutdown latency.
    pub poll_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: LSEB_CMD_SRV.to_string(),
            max_clients: DEFAULT_MAX_CLIENTS,
            recv_buf: DEFAULT_RECV_BUF,
            poll_timeout: Duration::from_millis(500),
        }
    }
}

/// Signals a running server to leave its loop. The poll timeout bounds how
/// long the signal can go unnoticed.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Command server: accepts clients, reads framed command messages, and
/// answers each on a detached worker through the shared writer thread.
pub struct CmdServer {
    net: NetManager,
    listener: Handle,
    slots: SlotTable,
    poller: PollReadiness,
    writer_tx: Sender<WriterMsg>,
    server_task: TaskId,
    recv_buf: usize,
    next_conn_id: u64,
    running: Arc<AtomicBool>,
}

impl CmdServer {
    /// Bind the configured endpoint and spawn the writer thread. The loop
    /// does not start until [`run`](Self::run).
    pub fn bind(directory: Directory, config: ServerConfig) -> Result<Self> {
        let server_task = directory.entry(&config.endpoint, EndpointKind::Tcp)?.task;
        let mut net = NetManager::new(directory);
        let listener = net.init_listener(&config.endpoint)?;
        // The loop only touches the listener when poll says so, but a
        // client that resets between poll and accept must not block it.
        net.set_io_mode(listener, IoMode::NonBlocking)?;
        let writer_tx = writer::spawn()?;

        info!(
            endpoint = %config.endpoint,
            capacity = config.max_clients,
            "command server bound"
        );
        Ok(Self {
            net,
            listener,
            slots: SlotTable::new(config.max_clients),
            poller: PollReadiness::with_timeout(config.poll_timeout),
            writer_tx,
            server_task,
            recv_buf: config.recv_buf,
            next_conn_id: 0,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.running))
    }

    /// The bound listen address, useful when the endpoint port is 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.net.local_addr(self.listener)?)
    }

    /// Run the accept/receive loop until shut down or a fatal error.
    pub fn run(&mut self) -> Result<()> {
        let result = self.serve();
        self.close_all();
        result
    }

    fn serve(&mut self) -> Result<()> {
        while self.running.load(Ordering::SeqCst) {
            let listener_fd = self.net.raw_fd(self.listener)?;
            let mut fds = vec![listener_fd];
            let occupied: Vec<(usize, ClientSlot)> = self.slots.iter_occupied().collect();
            for &(_, slot) in &occupied {
                fds.push(self.net.raw_fd(slot.handle)?);
            }

            let ready: HashSet<RawFd> =
                self.poller.wait_readable(&fds)?.into_iter().collect();
            if ready.is_empty() {
                continue;
            }

            if ready.contains(&listener_fd) {
                self.accept_client()?;
            }
            for (idx, slot) in occupied {
                if ready.contains(&self.net.raw_fd(slot.handle)?) {
                    self.service_slot(idx, slot);
                }
            }
        }
        info!("shutdown requested, leaving server loop");
        Ok(())
    }

    fn accept_client(&mut self) -> Result<()> {
        let conn = match self.net.accept(self.listener) {
            Ok(h) => h,
            // The peer went away between poll and accept.
            Err(NetError::WouldBlock) => return Ok(()),
            Err(err) => {
                warn!(%err, "accept failed, stopping server");
                return Err(err.into());
            }
        };

        if self.slots.is_full() {
            warn!(%conn, "client table full, turning connection away");
            let _ = self.net.close(conn);
            return Ok(());
        }

        // Only the accept itself can take the server down. A connection
        // that dies during admission (a peer can reset before we ever
        // touch it) is dropped like any other dead client.
        if let Err(err) = self.admit_client(conn) {
            warn!(%conn, %err, "new connection unusable, dropping it");
            let _ = self.net.close(conn);
        }
        Ok(())
    }

    fn admit_client(&mut self, conn: Handle) -> std::result::Result<(), NetError> {
        let (task, host) = self.net.peer_identity(conn)?;
        let stream = self.net.clone_stream(conn)?;

        let conn_id = self.next_conn_id;
        self.next_conn_id += 1;
        // Register before the slot goes live so no response can beat it.
        let _ = self.writer_tx.send(WriterMsg::Register {
            conn: conn_id,
            stream,
        });
        // Capacity was checked by the caller.
        self.slots.occupy(conn, conn_id);

        info!(conn_id, task, %host, clients = self.slots.len(), "client connected");
        Ok(())
    }

    fn service_slot(&mut self, idx: usize, slot: ClientSlot) {
        let mut buf = vec![0u8; self.recv_buf];
        match self.net.recv(slot.handle, &mut buf) {
            Ok(n) => self.handle_message(slot, &buf[..n]),
            Err(NetError::Eof) => {
                info!(conn_id = slot.conn_id, "client disconnected");
                self.drop_slot(idx, slot);
            }
            Err(NetError::WouldBlock) => {}
            Err(err) => {
                warn!(conn_id = slot.conn_id, %err, "receive failed, dropping client");
                self.drop_slot(idx, slot);
            }
        }
    }

    fn handle_message(&mut self, slot: ClientSlot, wire: &[u8]) {
        let hdr = match MsgHdr::decode(&mut &*wire) {
            Ok(hdr) => hdr,
            Err(err) => {
                warn!(conn_id = slot.conn_id, %err, "unreadable message header, ignoring");
                return;
            }
        };
        match hdr.class() {
            Some(MsgClass::Command) => match CmdMsg::decode(wire) {
                Ok(cmd) => {
                    debug!(
                        conn_id = slot.conn_id,
                        seq = cmd.hdr.seq_no,
                        cmd = %cmd.cmd,
                        "command received"
                    );
                    dispatch_command(slot.conn_id, cmd, self.server_task, self.writer_tx.clone());
                }
                Err(err) => {
                    warn!(conn_id = slot.conn_id, %err, "malformed command, ignoring");
                }
            },
            other => {
                warn!(
                    conn_id = slot.conn_id,
                    msg_id = hdr.msg_id,
                    class = ?other,
                    "unsupported message class, ignoring"
                );
            }
        }
    }

    fn drop_slot(&mut self, idx: usize, slot: ClientSlot) {
        self.slots.free(idx);
        let _ = self.writer_tx.send(WriterMsg::Unregister {
            conn: slot.conn_id,
        });
        if let Err(err) = self.net.close(slot.handle) {
            warn!(conn_id = slot.conn_id, %err, "close failed");
        }
    }

    fn close_all(&mut self) {
        let occupied: Vec<(usize, ClientSlot)> = self.slots.iter_occupied().collect();
        for (idx, slot) in occupied {
            self.drop_slot(idx, slot);
        }
        let _ = self.net.close(self.listener);
        debug!("all connections closed");
    }
}
