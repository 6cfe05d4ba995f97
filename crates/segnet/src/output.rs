use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use segnet_msg::RspMsg;
use segnet_transport::{Directory, EndpointKind};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    src_id: u16,
    seq_no: u16,
    response: &'a str,
}

pub fn print_response(rsp: &RspMsg, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ResponseOutput {
                src_id: rsp.hdr.src_id,
                seq_no: rsp.hdr.seq_no,
                response: &rsp.rsp,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SRC", "SEQ", "RESPONSE"])
                .add_row(vec![
                    rsp.hdr.src_id.to_string(),
                    rsp.hdr.seq_no.to_string(),
                    rsp.rsp.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "src={} seq={} response={}",
                rsp.hdr.src_id, rsp.hdr.seq_no, rsp.rsp
            );
        }
    }
}

#[derive(Serialize)]
struct EndpointOutput<'a> {
    name: &'a str,
    kind: &'static str,
    task: u16,
    port: u16,
}

pub fn print_endpoints(directory: &Directory, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<EndpointOutput<'_>> = directory
                .endpoints()
                .iter()
                .map(|e| EndpointOutput {
                    name: &e.name,
                    kind: kind_name(e.kind),
                    task: e.task,
                    port: e.port,
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NAME", "KIND", "TASK", "PORT"]);
            for e in directory.endpoints() {
                table.add_row(vec![
                    e.name.clone(),
                    kind_name(e.kind).to_string(),
                    e.task.to_string(),
                    e.port.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for e in directory.endpoints() {
                println!(
                    "name={} kind={} task={} port={}",
                    e.name,
                    kind_name(e.kind),
                    e.task,
                    e.port
                );
            }
        }
    }
}

fn kind_name(kind: EndpointKind) -> &'static str {
    match kind {
        EndpointKind::Tcp => "TCP",
        EndpointKind::Udp => "UDP",
        EndpointKind::Broadcast => "BRDCST",
    }
}
