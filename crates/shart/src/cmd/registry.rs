use crate::cmd::{RegistryArgs, ShowRegistryArgs};
use crate::exit::{io_error, CliResult, SUCCESS};
use crate::output::{write_registry, OutputFormat};

pub fn run(
    _args: ShowRegistryArgs,
    layouts: &RegistryArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let registry = layouts.load()?;
    let mut out = std::io::stdout().lock();
    write_registry(&mut out, &registry, &layouts.source(), format)
        .map_err(|err| io_error("failed writing registry", err))?;
    Ok(SUCCESS)
}
