mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, RegistryArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "shart", version, about = "Shart telemetry packet decoder")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(flatten)]
    registry: RegistryArgs,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.registry, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use shart::schema::Profile;

    use super::*;

    #[cfg(unix)]
    #[test]
    fn parses_listen_subcommand() {
        let cli = Cli::try_parse_from([
            "shart",
            "listen",
            "/dev/ttyUSB0",
            "--baud",
            "115200",
            "--threshold",
            "60",
            "--mirror",
            "flight.shart",
            "--imu",
        ])
        .expect("listen args should parse");

        let Command::Listen(args) = cli.command else {
            panic!("expected listen");
        };
        assert_eq!(args.baud, 115_200);
        assert_eq!(args.threshold, 60);
        assert!(args.imu);
        assert!(args.mirror.is_some());
    }

    #[test]
    fn global_registry_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "shart",
            "read",
            "capture.bin",
            "--profile",
            "sd-log",
            "--sync-byte",
            "0x55",
        ])
        .expect("global flags should parse after the subcommand");

        assert_eq!(cli.registry.profile, Profile::SdLog);
        assert_eq!(cli.registry.sync_byte, 0x55);
        assert!(matches!(cli.command, Command::Read(_)));
    }

    #[test]
    fn rejects_unknown_profile() {
        let err = Cli::try_parse_from(["shart", "--profile", "rover", "registry"])
            .expect_err("unknown profile should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_out_of_range_sync_byte() {
        let err = Cli::try_parse_from(["shart", "--sync-byte", "0x1AA", "registry"])
            .expect_err("sync byte must fit in a byte");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[cfg(unix)]
    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from(["shart", "send", "/dev/ttyACM0", "stop"])
            .expect("send args should parse");
        assert!(matches!(cli.command, Command::Send(_)));
    }
}
