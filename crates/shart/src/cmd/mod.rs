use std::path::PathBuf;
use std::sync::Arc;
#[cfg(unix)]
use std::time::Duration;

use clap::{Args, Subcommand};
use shart::frame::{FrameConfig, DEFAULT_READY_THRESHOLD, SYNC_BYTE};
use shart::schema::{parse_tag, PacketRegistry, Profile};

use crate::exit::{schema_error, CliResult};
#[cfg(unix)]
use crate::exit::{CliError, USAGE};
use crate::output::OutputFormat;

pub mod envinfo;
#[cfg(unix)]
pub mod listen;
pub mod read;
pub mod registry;
#[cfg(unix)]
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a capture file.
    Read(ReadArgs),
    /// Listen on a serial device and print packets as they arrive.
    #[cfg(unix)]
    Listen(ListenArgs),
    /// Send a command packet to a serial device.
    #[cfg(unix)]
    Send(SendArgs),
    /// Print the active packet registry.
    Registry(ShowRegistryArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, layouts: &RegistryArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Read(args) => read::run(args, layouts, format),
        #[cfg(unix)]
        Command::Listen(args) => listen::run(args, layouts, format),
        #[cfg(unix)]
        Command::Send(args) => send::run(args, layouts, format),
        Command::Registry(args) => registry::run(args, layouts, format),
        Command::Version(args) => version::run(args, format),
        Command::Envinfo(args) => envinfo::run(args, layouts, format),
    }
}

/// Packet layout selection shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct RegistryArgs {
    /// Built-in layout profile (telemetry, legacy, sd-log).
    #[arg(
        long,
        value_name = "PROFILE",
        env = "SHART_PROFILE",
        default_value_t = Profile::Telemetry,
        global = true
    )]
    pub profile: Profile,

    /// JSON registry file. Overrides --profile.
    #[arg(long, value_name = "FILE", env = "SHART_REGISTRY", global = true)]
    pub registry: Option<PathBuf>,

    /// Frame sync byte (decimal or 0x-prefixed hex).
    #[arg(
        long,
        value_name = "BYTE",
        default_value = "0xAA",
        value_parser = parse_byte,
        global = true
    )]
    pub sync_byte: u8,
}

impl RegistryArgs {
    pub fn load(&self) -> CliResult<Arc<PacketRegistry>> {
        let registry = match &self.registry {
            Some(path) => PacketRegistry::from_file(path).map_err(|err| {
                schema_error(&format!("failed loading registry {}", path.display()), err)
            })?,
            None => self
                .profile
                .registry()
                .map_err(|err| schema_error(&format!("profile {}", self.profile), err))?,
        };
        Ok(Arc::new(registry))
    }

    /// Describe where the active layouts come from.
    pub fn source(&self) -> String {
        match &self.registry {
            Some(path) => path.display().to_string(),
            None => format!("profile:{}", self.profile),
        }
    }

    pub fn frame_config(&self, ready_threshold: usize) -> FrameConfig {
        FrameConfig {
            sync_byte: self.sync_byte,
            ready_threshold,
        }
    }
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Capture file to decode.
    pub file: PathBuf,
    /// Stop after N valid packets.
    #[arg(long)]
    pub count: Option<usize>,
    /// Append converted IMU values to sensor packets.
    #[arg(long)]
    pub imu: bool,
}

#[cfg(unix)]
#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Serial device path (e.g. /dev/ttyUSB0).
    pub device: PathBuf,
    /// Line speed.
    #[arg(long, default_value_t = 230_400)]
    pub baud: u32,
    /// Delay between attempts while the device is unavailable (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub retry_interval: String,
    /// Give up after N open attempts. Default: retry until interrupted.
    #[arg(long)]
    pub max_attempts: Option<u32>,
    /// Bytes that must be waiting before a frame is read.
    #[arg(long, default_value_t = DEFAULT_READY_THRESHOLD)]
    pub threshold: usize,
    /// Sleep between polls while waiting for data (e.g. 5ms).
    #[arg(long, default_value = "5ms")]
    pub poll_interval: String,
    /// Exit after receiving N valid packets.
    #[arg(long)]
    pub count: Option<usize>,
    /// Write every complete frame received, valid or not, to FILE.
    #[arg(long, value_name = "FILE")]
    pub mirror: Option<PathBuf>,
    /// Append converted IMU values to sensor packets.
    #[arg(long)]
    pub imu: bool,
}

#[cfg(unix)]
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Serial device path.
    pub device: PathBuf,
    /// `start`, `stop`, or a raw i32 command word (decimal or 0x hex).
    #[arg(allow_hyphen_values = true)]
    pub command: String,
    /// Line speed.
    #[arg(long, default_value_t = 230_400)]
    pub baud: u32,
}

#[derive(Args, Debug, Default)]
pub struct ShowRegistryArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}

/// Baud rates the serial transport accepts. Empty where it is unavailable.
pub(crate) fn supported_baud_rates() -> &'static [u32] {
    #[cfg(unix)]
    {
        &shart::transport::SUPPORTED_BAUD_RATES
    }
    #[cfg(not(unix))]
    {
        &[]
    }
}

fn parse_byte(input: &str) -> Result<u8, String> {
    parse_tag(input)
        .ok_or_else(|| format!("expected a byte value like {SYNC_BYTE:#04X}, got {input:?}"))
}

#[cfg(unix)]
pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_args(profile: Profile) -> RegistryArgs {
        RegistryArgs {
            profile,
            registry: None,
            sync_byte: SYNC_BYTE,
        }
    }

    #[cfg(unix)]
    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }

    #[test]
    fn baud_rates_reported_only_with_serial_support() {
        assert_eq!(supported_baud_rates().is_empty(), !cfg!(unix));
        if cfg!(unix) {
            assert!(supported_baud_rates().contains(&230_400));
        }
    }

    #[test]
    fn parse_byte_accepts_hex_and_decimal() {
        assert_eq!(parse_byte("0xAA"), Ok(0xAA));
        assert_eq!(parse_byte("170"), Ok(0xAA));
        assert!(parse_byte("256").is_err());
    }

    #[test]
    fn profile_registry_loads() {
        let registry = profile_args(Profile::Legacy).load().unwrap();
        assert_eq!(
            registry.lookup(shart::schema::SENSOR).unwrap().payload_length(),
            60
        );
        assert_eq!(profile_args(Profile::Legacy).source(), "profile:legacy");
    }

    #[test]
    fn missing_registry_file_fails() {
        let args = RegistryArgs {
            registry: Some(PathBuf::from("/nonexistent/shart-registry.json")),
            ..profile_args(Profile::Telemetry)
        };
        assert!(args.load().is_err());
    }

    #[test]
    fn frame_config_carries_sync_byte() {
        let args = RegistryArgs {
            sync_byte: 0x55,
            ..profile_args(Profile::Telemetry)
        };
        let config = args.frame_config(12);
        assert_eq!(config.sync_byte, 0x55);
        assert_eq!(config.ready_threshold, 12);
    }
}
