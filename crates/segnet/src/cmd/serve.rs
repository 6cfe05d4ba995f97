use segnet_server::{CmdServer, ServerConfig, ShutdownHandle};
use segnet_transport::Directory;

use crate::cmd::ServeArgs;
use crate::exit::{server_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let config = ServerConfig {
        endpoint: args.service,
        max_clients: args.capacity,
        ..ServerConfig::default()
    };
    let mut server = CmdServer::bind(Directory::glc_default(), config)
        .map_err(|err| server_error("bind failed", err))?;

    install_ctrlc_handler(server.shutdown_handle())?;

    server
        .run()
        .map_err(|err| server_error("server failed", err))?;
    Ok(SUCCESS)
}

fn install_ctrlc_handler(shutdown: ShutdownHandle) -> CliResult<()> {
    ctrlc::set_handler(move || {
        shutdown.shutdown();
    })
    .map_err(|err| {
        CliError::new(
            INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
