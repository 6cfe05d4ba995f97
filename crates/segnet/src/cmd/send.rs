use segnet_msg::{CmdMsg, RspMsg, RSP_MSG_LEN};
use segnet_transport::{Directory, IoMode, NetManager};

use crate::cmd::SendArgs;
use crate::exit::{msg_error, net_error, CliResult, SUCCESS};
use crate::output::{print_response, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let mut net = NetManager::new(Directory::glc_default());
    let conn = net
        .connect(&args.service, &args.host, args.task, IoMode::Blocking)
        .map_err(|err| net_error("connect failed", err))?;

    let cmd = CmdMsg::new(args.task, args.seq, &args.command);
    net.send(conn, &cmd.encode())
        .map_err(|err| net_error("send failed", err))?;

    let mut buf = [0u8; RSP_MSG_LEN];
    let n = net
        .recv(conn, &mut buf)
        .map_err(|err| net_error("receive failed", err))?;
    let rsp = RspMsg::decode(&buf[..n]).map_err(|err| msg_error("bad response", err))?;

    print_response(&rsp, format);

    net.close(conn).map_err(|err| net_error("close failed", err))?;
    Ok(SUCCESS)
}
