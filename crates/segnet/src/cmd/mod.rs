use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod endpoints;
pub mod send;
pub mod serve;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the command server.
    Serve(ServeArgs),
    /// Send one command and print the response.
    Send(SendArgs),
    /// List the endpoint directory.
    Endpoints(EndpointsArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Send(args) => send::run(args, format),
        Command::Endpoints(args) => endpoints::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Directory endpoint to listen on.
    #[arg(long, short = 's', default_value = "app_srv20")]
    pub service: String,
    /// Maximum simultaneous clients.
    #[arg(long, default_value_t = segnet_server::DEFAULT_MAX_CLIENTS)]
    pub capacity: usize,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Host running the server.
    pub host: String,
    /// Command text to send.
    pub command: String,
    /// Directory endpoint to connect to.
    #[arg(long, short = 's', default_value = "app_srv20")]
    pub service: String,
    /// Task id to connect as (0 binds an ephemeral source port).
    #[arg(long, short = 't', default_value_t = 0)]
    pub task: u16,
    /// Sequence number echoed back in the response.
    #[arg(long, default_value_t = 1)]
    pub seq: u16,
}

#[derive(Args, Debug, Default)]
pub struct EndpointsArgs {}
