//! Command dispatch.
//!
//! Each command runs on its own detached worker thread so a slow command
//! never stalls the accept/receive loop. Workers hand their response to
//! the writer thread instead of touching the socket themselves.

use std::sync::mpsc::Sender;
use std::thread;

use tracing::{debug, warn};

use segnet_msg::{clamp_text, CmdMsg, RspMsg};
use segnet_transport::TaskId;

use crate::writer::WriterMsg;

/// Longest command token echoed back in a response. Leaves room in the
/// fixed response field for the completion suffix.
const MAX_ECHO_LEN: usize = 240;

/// Run `cmd` from connection `conn` on a detached worker thread.
pub fn dispatch_command(conn: u64, cmd: CmdMsg, server_task: TaskId, writer: Sender<WriterMsg>) {
    let spawned = thread::Builder::new()
        .name(format!("segnet-cmd-{conn}"))
        .spawn(move || {
            let rsp = execute(&cmd, server_task);
            debug!(conn, seq = cmd.hdr.seq_no, "command complete");
            // A send failure means the server is shutting down.
            let _ = writer.send(WriterMsg::Respond { conn, rsp });
        });
    if let Err(err) = spawned {
        warn!(conn, %err, "worker spawn failed, command dropped");
    }
}

/// Execute one command, producing the response that echoes its verb and
/// sequence number.
fn execute(cmd: &CmdMsg, server_task: TaskId) -> RspMsg {
    let verb = cmd.cmd.split_whitespace().next().unwrap_or("");
    let verb = clamp_text(verb, MAX_ECHO_LEN);
    RspMsg::new(server_task, cmd.hdr.seq_no, &format!("{verb}: Completed."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    use segnet_transport::LSEB_CMD_TASK;

    #[test]
    fn response_echoes_verb_and_seq() {
        let cmd = CmdMsg::new(13, 42, "STATUS now please");
        let rsp = execute(&cmd, LSEB_CMD_TASK);
        assert_eq!(rsp.rsp, "STATUS: Completed.");
        assert_eq!(rsp.hdr.seq_no, 42);
        assert_eq!(rsp.hdr.src_id, LSEB_CMD_TASK);
    }

    #[test]
    fn empty_command_still_answered() {
        let cmd = CmdMsg::new(13, 1, "");
        let rsp = execute(&cmd, 120);
        assert_eq!(rsp.rsp, ": Completed.");
    }

    #[test]
    fn long_verb_clamped() {
        let verb = "V".repeat(300);
        let cmd = CmdMsg::new(13, 2, &verb);
        let rsp = execute(&cmd, 120);
        assert!(rsp.rsp.starts_with("VVV"));
        assert!(rsp.rsp.ends_with(": Completed."));
        assert_eq!(rsp.rsp.len(), MAX_ECHO_LEN + ": Completed.".len());
    }

    #[test]
    fn dispatched_response_arrives_on_channel() {
        let (tx, rx) = channel();
        let cmd = CmdMsg::new(13, 9, "HALT");
        dispatch_command(7, cmd, 120, tx);

        match rx.recv().unwrap() {
            WriterMsg::Respond { conn, rsp } => {
                assert_eq!(conn, 7);
                assert_eq!(rsp.rsp, "HALT: Completed.");
                assert_eq!(rsp.hdr.seq_no, 9);
            }
            other => panic!("unexpected writer message: {other:?}"),
        }
    }
}
