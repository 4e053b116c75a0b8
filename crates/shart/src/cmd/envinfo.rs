use std::collections::BTreeMap;
use std::path::Path;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::cmd::{supported_baud_rates, EnvinfoArgs, RegistryArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

const ENV_VARS: [&str; 3] = ["SHART_PROFILE", "SHART_REGISTRY", "RUST_LOG"];

/// Device name prefixes of USB serial adapters and on-board UARTs.
const SERIAL_PREFIXES: [&str; 5] = [
    "ttyUSB",
    "ttyACM",
    "ttyAMA",
    "cu.usbserial",
    "cu.usbmodem",
];

#[derive(Serialize)]
struct BuildInfo {
    version: &'static str,
    target: String,
    rustc: &'static str,
    git_hash: &'static str,
}

#[derive(Serialize)]
struct RegistryInfo {
    source: String,
    sync_byte: String,
    /// `tag -> name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    layouts: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct EnvInfoOutput {
    build: BuildInfo,
    registry: RegistryInfo,
    serial_devices: Vec<String>,
    baud_rates: Vec<u32>,
    environment: BTreeMap<String, Option<String>>,
}

pub fn run(_args: EnvinfoArgs, layouts: &RegistryArgs, format: OutputFormat) -> CliResult<i32> {
    let output = EnvInfoOutput {
        build: BuildInfo {
            version: env!("CARGO_PKG_VERSION"),
            target: target_triple(),
            rustc: option_env!("RUSTC_VERSION").unwrap_or("unknown"),
            git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        },
        registry: registry_info(layouts),
        serial_devices: serial_devices(Path::new("/dev")),
        baud_rates: supported_baud_rates().to_vec(),
        environment: ENV_VARS
            .iter()
            .map(|name| (name.to_string(), std::env::var(name).ok()))
            .collect(),
    };

    print_envinfo(&output, format);
    Ok(SUCCESS)
}

fn registry_info(layouts: &RegistryArgs) -> RegistryInfo {
    let (loaded, error) = match layouts.load() {
        Ok(registry) => {
            let names: BTreeMap<String, String> = registry
                .tags()
                .into_iter()
                .map(|tag| {
                    let name = registry.name(tag).unwrap_or_default().to_string();
                    (format!("{tag:#04x}"), name)
                })
                .collect();
            (Some(names), None)
        }
        Err(err) => (None, Some(err.message)),
    };

    RegistryInfo {
        source: layouts.source(),
        sync_byte: format!("{:#04x}", layouts.sync_byte),
        layouts: loaded,
        error,
    }
}

fn serial_devices(dev: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dev) else {
        return Vec::new();
    };
    let mut devices: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            SERIAL_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
        })
        .map(|entry| entry.path().display().to_string())
        .collect();
    devices.sort();
    devices
}

fn target_triple() -> String {
    match option_env!("SHART_BUILD_TARGET") {
        Some(target) => target.to_string(),
        None => format!(
            "{}-unknown-{}",
            std::env::consts::ARCH,
            std::env::consts::OS
        ),
    }
}

fn layout_summary(registry: &RegistryInfo) -> String {
    match (&registry.layouts, &registry.error) {
        (Some(layouts), _) => layouts
            .iter()
            .map(|(tag, name)| format!("{tag}={name}"))
            .collect::<Vec<_>>()
            .join(" "),
        (None, Some(err)) => format!("error: {err}"),
        (None, None) => String::new(),
    }
}

fn print_envinfo(output: &EnvInfoOutput, format: OutputFormat) {
    let devices = if output.serial_devices.is_empty() {
        "(none found)".to_string()
    } else {
        output.serial_devices.join(" ")
    };
    let rows = [
        ("version", output.build.version.to_string()),
        ("target", output.build.target.clone()),
        ("rustc", output.build.rustc.to_string()),
        ("git_hash", output.build.git_hash.to_string()),
        ("registry", output.registry.source.clone()),
        ("sync_byte", output.registry.sync_byte.clone()),
        ("layouts", layout_summary(&output.registry)),
        ("serial_devices", devices),
    ];

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Csv => {
            println!("key,value");
            for (key, value) in &rows {
                println!("{key},{value}");
            }
            for (key, value) in &output.environment {
                println!("{key},{}", value.as_deref().unwrap_or(""));
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KEY", "VALUE"]);
            for (key, value) in &rows {
                table.add_row(vec![key.to_string(), value.clone()]);
            }
            for (key, value) in &output.environment {
                table.add_row(vec![
                    key.clone(),
                    value.clone().unwrap_or_else(|| "(not set)".to_string()),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("shart environment\n");
            for (key, value) in &rows {
                println!("  {key:<16} {value}");
            }
            println!("\n  Environment:");
            for (key, value) in &output.environment {
                println!("    {key:<16} {}", value.as_deref().unwrap_or("(not set)"));
            }
        }
        OutputFormat::Raw => println!("{}", output.build.version),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use shart::frame::SYNC_BYTE;
    use shart::schema::Profile;

    use super::*;

    fn profile_args() -> RegistryArgs {
        RegistryArgs {
            profile: Profile::Telemetry,
            registry: None,
            sync_byte: SYNC_BYTE,
        }
    }

    #[test]
    fn registry_info_lists_layouts() {
        let info = registry_info(&profile_args());
        assert_eq!(info.source, "profile:telemetry");
        assert_eq!(info.sync_byte, "0xaa");
        assert!(info.error.is_none());
        let layouts = info.layouts.unwrap();
        assert_eq!(layouts.get("0x0b").map(String::as_str), Some("sensor"));
        assert_eq!(layouts.len(), 3);
    }

    #[test]
    fn registry_load_error_is_reported_not_fatal() {
        let args = RegistryArgs {
            registry: Some(PathBuf::from("/nonexistent/shart-layouts.json")),
            ..profile_args()
        };
        let info = registry_info(&args);
        assert!(info.layouts.is_none());
        assert!(info.error.is_some());
        assert!(layout_summary(&info).starts_with("error: "));
    }

    #[test]
    fn finds_serial_devices_by_prefix() {
        let dir = std::env::temp_dir().join(format!("shart-envinfo-dev-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["ttyUSB0", "ttyACM1", "null", "tty0"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }

        let devices = serial_devices(&dir);
        assert_eq!(devices.len(), 2);
        assert!(devices[0].ends_with("ttyACM1"));
        assert!(devices[1].ends_with("ttyUSB0"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn envinfo_json_shape() {
        let output = EnvInfoOutput {
            build: BuildInfo {
                version: "0.1.0",
                target: "x86_64-unknown-linux-gnu".to_string(),
                rustc: "unknown",
                git_hash: "unknown",
            },
            registry: registry_info(&profile_args()),
            serial_devices: Vec::new(),
            baud_rates: vec![115_200, 230_400],
            environment: BTreeMap::from([("SHART_PROFILE".to_string(), None)]),
        };

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["environment"]["SHART_PROFILE"], serde_json::Value::Null);
        assert_eq!(value["registry"]["layouts"]["0xca"], "gps");
        assert_eq!(value["baud_rates"][1], 230_400);
    }
}
