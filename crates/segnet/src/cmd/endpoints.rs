use segnet_transport::Directory;

use crate::cmd::EndpointsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_endpoints, OutputFormat};

pub fn run(_args: EndpointsArgs, format: OutputFormat) -> CliResult<i32> {
    print_endpoints(&Directory::glc_default(), format);
    Ok(SUCCESS)
}
