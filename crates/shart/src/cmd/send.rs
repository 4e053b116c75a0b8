use serde::Serialize;
use shart::frame::{FrameWriter, HEADER_SIZE};
use shart::schema::{FieldValue, COMMAND, START_COMMAND, STOP_COMMAND};
use shart::transport::{SerialConfig, SerialPort};

use crate::cmd::{RegistryArgs, SendArgs};
use crate::exit::{frame_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct SentOutput<'a> {
    device: String,
    tag: String,
    command: &'a str,
    value: i32,
    bytes: usize,
}

pub fn run(args: SendArgs, layouts: &RegistryArgs, format: OutputFormat) -> CliResult<i32> {
    let value = parse_command(&args.command)?;
    let registry = layouts.load()?;
    let payload_length = registry
        .lookup(COMMAND)
        .map(|spec| spec.payload_length())
        .ok_or_else(|| {
            CliError::new(
                USAGE,
                format!("registry {} has no command layout", layouts.source()),
            )
        })?;

    let config = SerialConfig {
        baud_rate: args.baud,
        ..SerialConfig::default()
    };
    let port =
        SerialPort::open(&args.device, &config).map_err(|err| transport_error("open failed", err))?;

    let mut writer = FrameWriter::with_config(port, layouts.frame_config(0));
    writer
        .send_packet(&registry, COMMAND, &[FieldValue::I32(value)])
        .map_err(|err| frame_error("send failed", err))?;

    let out = SentOutput {
        device: args.device.display().to_string(),
        tag: format!("{COMMAND:#04x}"),
        command: command_name(value),
        value,
        bytes: HEADER_SIZE + payload_length,
    };
    print_sent(&out, format);
    Ok(SUCCESS)
}

fn parse_command(input: &str) -> CliResult<i32> {
    let input = input.trim();
    match input.to_ascii_lowercase().as_str() {
        "start" => return Ok(START_COMMAND),
        "stop" => return Ok(STOP_COMMAND),
        _ => {}
    }

    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        // Hex words are bit patterns; allow the full u32 range.
        Some(hex) => u32::from_str_radix(hex, 16).map(|v| v as i32).ok(),
        None => input.parse::<i32>().ok(),
    };
    parsed.ok_or_else(|| {
        CliError::new(
            USAGE,
            format!("invalid command {input:?}: expected start, stop, or an i32"),
        )
    })
}

fn command_name(value: i32) -> &'static str {
    match value {
        START_COMMAND => "start",
        STOP_COMMAND => "stop",
        _ => "raw",
    }
}

fn print_sent(out: &SentOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Csv => println!(
            "{},{},{},{},{}",
            out.device, out.tag, out.command, out.value, out.bytes
        ),
        OutputFormat::Raw => println!("{}", out.value),
        OutputFormat::Table | OutputFormat::Pretty => println!(
            "sent {} ({:#010x}) to {} [{} bytes]",
            out.command.to_ascii_uppercase(),
            out.value,
            out.device,
            out.bytes
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_commands() {
        assert_eq!(parse_command("start").unwrap(), 0x6D65_6F77);
        assert_eq!(parse_command("STOP").unwrap(), 0x6D69_6175);
    }

    #[test]
    fn raw_command_words() {
        assert_eq!(parse_command("42").unwrap(), 42);
        assert_eq!(parse_command("-1").unwrap(), -1);
        assert_eq!(parse_command("0x6D656F77").unwrap(), START_COMMAND);
        assert_eq!(parse_command("0xFFFFFFFF").unwrap(), -1);
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_command("launch").unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(parse_command("0x1_0000_0000").is_err());
    }

    #[test]
    fn names_known_words() {
        assert_eq!(command_name(START_COMMAND), "start");
        assert_eq!(command_name(7), "raw");
    }
}
