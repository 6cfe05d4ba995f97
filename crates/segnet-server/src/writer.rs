//! Dedicated response writer.
//!
//! All responses funnel through one thread that owns a write duplicate of
//! each client stream, so workers finishing concurrently can never
//! interleave bytes within a frame. Streams are keyed by connection id,
//! which is never reused; a response for a client that dropped while its
//! command was in flight is discarded rather than misrouted to whoever
//! inherited the slot.

use std::collections::HashMap;
use std::io;
use std::net::TcpStream;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use tracing::{debug, trace, warn};

use segnet_frame::write_frame;
use segnet_msg::RspMsg;

/// Requests understood by the writer thread.
#[derive(Debug)]
pub enum WriterMsg {
    /// Track a new connection's write side.
    Register { conn: u64, stream: TcpStream },
    /// Forget a connection; its stream is dropped.
    Unregister { conn: u64 },
    /// Frame and send a response on a registered connection.
    Respond { conn: u64, rsp: RspMsg },
}

/// Spawn the writer thread. It exits when every [`Sender`] is dropped.
pub fn spawn() -> io::Result<Sender<WriterMsg>> {
    let (tx, rx) = channel();
    thread::Builder::new()
        .name("segnet-writer".to_string())
        .spawn(move || writer_loop(rx))?;
    Ok(tx)
}

fn writer_loop(rx: Receiver<WriterMsg>) {
    let mut streams: HashMap<u64, TcpStream> = HashMap::new();
    while let Ok(msg) = rx.recv() {
        match msg {
            WriterMsg::Register { conn, stream } => {
                streams.insert(conn, stream);
            }
            WriterMsg::Unregister { conn } => {
                streams.remove(&conn);
            }
            WriterMsg::Respond { conn, rsp } => {
                let Some(stream) = streams.get_mut(&conn) else {
                    // Client dropped before its response was ready.
                    debug!(conn, "dropping response for departed connection");
                    continue;
                };
                match write_frame(stream, &rsp.encode()) {
                    Ok(n) => trace!(conn, bytes = n, "response sent"),
                    Err(err) => {
                        warn!(conn, %err, "response send failed");
                        streams.remove(&conn);
                    }
                }
            }
        }
    }
    debug!("writer thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    use segnet_frame::read_frame;
    use segnet_msg::{RspMsg, RSP_MSG_LEN};

    fn stream_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn responses_reach_registered_connection() {
        let (mut client, server) = stream_pair();
        let tx = spawn().unwrap();

        tx.send(WriterMsg::Register {
            conn: 1,
            stream: server,
        })
        .unwrap();
        tx.send(WriterMsg::Respond {
            conn: 1,
            rsp: RspMsg::new(120, 5, "GO: Completed."),
        })
        .unwrap();

        let mut buf = [0u8; RSP_MSG_LEN];
        let n = read_frame(&mut client, &mut buf).unwrap();
        let rsp = RspMsg::decode(&buf[..n]).unwrap();
        assert_eq!(rsp.rsp, "GO: Completed.");
        assert_eq!(rsp.hdr.seq_no, 5);
    }

    #[test]
    fn unknown_connection_response_is_dropped() {
        let (mut client, server) = stream_pair();
        let tx = spawn().unwrap();

        tx.send(WriterMsg::Register {
            conn: 2,
            stream: server,
        })
        .unwrap();
        // No such connection; must not land on conn 2.
        tx.send(WriterMsg::Respond {
            conn: 99,
            rsp: RspMsg::new(120, 1, "STRAY: Completed."),
        })
        .unwrap();
        tx.send(WriterMsg::Respond {
            conn: 2,
            rsp: RspMsg::new(120, 2, "REAL: Completed."),
        })
        .unwrap();

        let mut buf = [0u8; RSP_MSG_LEN];
        let n = read_frame(&mut client, &mut buf).unwrap();
        let rsp = RspMsg::decode(&buf[..n]).unwrap();
        assert_eq!(rsp.rsp, "REAL: Completed.");
    }

    #[test]
    fn unregistered_stream_is_closed() {
        let (mut client, server) = stream_pair();
        let tx = spawn().unwrap();

        tx.send(WriterMsg::Register {
            conn: 3,
            stream: server,
        })
        .unwrap();
        tx.send(WriterMsg::Unregister { conn: 3 }).unwrap();

        let mut buf = [0u8; 16];
        // The writer held the only handle on the accept side, so the
        // unregister closes the connection.
        let got = read_frame(&mut client, &mut buf);
        assert!(matches!(got, Err(segnet_frame::FrameError::Eof)));
    }
}
