use serde::Serialize;
use shart::schema::Profile;

use crate::cmd::{supported_baud_rates, VersionArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct BuildProvenance {
    name: &'static str,
    version: &'static str,
    target_os: &'static str,
    target_arch: &'static str,
    rustc: &'static str,
    git_hash: &'static str,
    profiles: Vec<&'static str>,
    baud_rates: &'static [u32],
}

impl BuildProvenance {
    fn current() -> Self {
        Self {
            name: "shart",
            version: env!("CARGO_PKG_VERSION"),
            target_os: std::env::consts::OS,
            target_arch: std::env::consts::ARCH,
            rustc: option_env!("RUSTC_VERSION").unwrap_or("unknown"),
            git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
            profiles: Profile::ALL.iter().map(|profile| profile.name()).collect(),
            baud_rates: supported_baud_rates(),
        }
    }
}

/// The short form is always plain text; `--extended` follows `--format`.
pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.extended {
        println!("shart {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let info = BuildProvenance::current();
    if format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string(&info).unwrap_or_else(|_| "{}".to_string())
        );
        return Ok(SUCCESS);
    }

    let baud_rates: Vec<String> = info.baud_rates.iter().map(ToString::to_string).collect();
    println!("name: {}", info.name);
    println!("version: {}", info.version);
    println!("target: {}-{}", info.target_arch, info.target_os);
    println!("rustc: {}", info.rustc);
    println!("git_hash: {}", info.git_hash);
    println!("profiles: {}", info.profiles.join(", "));
    println!("baud_rates: {}", baud_rates.join(", "));

    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provenance_lists_profiles_and_rates() {
        let info = BuildProvenance::current();
        assert_eq!(info.profiles, vec!["telemetry", "legacy", "sd-log"]);
        assert_eq!(info.baud_rates.contains(&230_400), cfg!(unix));

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["name"], "shart");
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    }
}
