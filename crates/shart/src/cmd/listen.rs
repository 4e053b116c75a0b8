use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shart::driver::{DriverConfig, StreamDriver};
use shart::frame::{FrameReader, FrameWriter, StreamSource, DEFAULT_WAIT_INTERVAL};
use shart::transport::{SerialConfig, SerialPort, TransportError};
use tracing::info;

use crate::cmd::{parse_duration, ListenArgs, RegistryArgs};
use crate::exit::{
    driver_error, io_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS,
};
use crate::output::{OutputFormat, PacketPrinter};

pub fn run(args: ListenArgs, layouts: &RegistryArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = layouts.load()?;
    let serial_config = SerialConfig {
        baud_rate: args.baud,
        retry_interval: parse_duration(&args.retry_interval)?,
        max_attempts: args.max_attempts,
    };
    let driver_config = DriverConfig {
        poll_interval: parse_duration(&args.poll_interval)?,
        max_packets: args.count,
    };
    let frame_config = layouts.frame_config(args.threshold);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    info!(device = %args.device.display(), baud = args.baud, "opening serial port");
    let port = match SerialPort::open_with_retry(&args.device, &serial_config, || {
        running.load(Ordering::SeqCst)
    }) {
        Ok(port) => port,
        Err(TransportError::Cancelled { .. }) => return Ok(SUCCESS),
        Err(err) => return Err(transport_error("open failed", err)),
    };
    // Drop whatever queued up while nobody was listening.
    port.discard_input()
        .map_err(|err| transport_error("failed discarding stale input", err))?;

    let source = StreamSource::new(port).with_wait_interval(partial_frame_wait(args.baud));
    let reader = FrameReader::with_config(source, registry, frame_config.clone());
    let mut printer = PacketPrinter::stdout(format, args.imu);

    let result = match &args.mirror {
        Some(path) => {
            let file = File::create(path).map_err(|err| {
                io_error(&format!("failed creating {}", path.display()), err)
            })?;
            let mirror = FrameWriter::with_config(file, frame_config);
            StreamDriver::with_mirror(reader, mirror, driver_config).run(&mut printer, &running)
        }
        None => StreamDriver::new(reader, driver_config).run(&mut printer, &running),
    };
    result.map_err(|err| driver_error("listen failed", err))?;

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Time for 16 characters (8N1, 10 bits each) to arrive, at least
/// [`DEFAULT_WAIT_INTERVAL`].
fn partial_frame_wait(baud: u32) -> Duration {
    let micros = 160_000_000 / u64::from(baud.max(1));
    Duration::from_micros(micros).max(DEFAULT_WAIT_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_frame_wait_scales_with_baud() {
        assert_eq!(partial_frame_wait(9600), Duration::from_micros(16_666));
        assert_eq!(partial_frame_wait(230_400), DEFAULT_WAIT_INTERVAL);
        assert!(partial_frame_wait(57_600) > partial_frame_wait(115_200));
    }
}
