use std::sync::atomic::AtomicBool;

use shart::driver::{DriverConfig, StopReason, StreamDriver};
use shart::frame::{FileSource, FrameReader, DEFAULT_READY_THRESHOLD};
use tracing::warn;

use crate::cmd::{ReadArgs, RegistryArgs};
use crate::exit::{driver_error, io_error, CliResult, SUCCESS};
use crate::output::{OutputFormat, PacketPrinter};

pub fn run(args: ReadArgs, layouts: &RegistryArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = layouts.load()?;
    let source = FileSource::open(&args.file)
        .map_err(|err| io_error(&format!("failed opening {}", args.file.display()), err))?;

    let reader =
        FrameReader::with_config(source, registry, layouts.frame_config(DEFAULT_READY_THRESHOLD));
    let config = DriverConfig {
        max_packets: args.count,
        ..DriverConfig::default()
    };
    let mut driver = StreamDriver::new(reader, config);
    let mut printer = PacketPrinter::stdout(format, args.imu);

    // Files have no readiness gate and end on their own.
    let running = AtomicBool::new(true);
    let reason = driver
        .run(&mut printer, &running)
        .map_err(|err| driver_error("decode failed", err))?;

    if reason == StopReason::Truncated {
        warn!(file = %args.file.display(), "capture ends with a partial frame");
    }

    Ok(SUCCESS)
}
