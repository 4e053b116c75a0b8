#![cfg(all(unix, feature = "cli"))]

use std::process::{Command, Output};

fn shart(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_shart"))
        .env_remove("SHART_PROFILE")
        .env_remove("SHART_REGISTRY")
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("shart should run")
}

#[test]
fn registry_json_lists_profile_layouts() {
    let output = shart(&["--format", "json", "--profile", "sd-log", "registry"]);
    assert!(output.status.success());

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("registry output should be JSON");
    let packets = value["packets"].as_array().expect("packets array");
    assert_eq!(packets.len(), 3);
    assert_eq!(packets[0]["name"], "sensor");
    assert_eq!(packets[0]["payload_length"], 56);
    assert_eq!(packets[0]["format"], "<I11f3h2B");
}

#[test]
fn profile_from_environment() {
    let output = Command::new(env!("CARGO_BIN_EXE_shart"))
        .env("SHART_PROFILE", "legacy")
        .env_remove("SHART_REGISTRY")
        .args(["--format", "raw", "registry"])
        .output()
        .expect("shart should run");
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert_eq!(text.lines().next(), Some("<I3i11f"));
}

#[test]
fn send_to_missing_device_is_transport_error() {
    let output = shart(&["send", "/nonexistent/ttyUSB9", "start"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn send_rejects_unknown_command_word() {
    let output = shart(&["send", "/nonexistent/ttyUSB9", "launch"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn listen_gives_up_after_max_attempts() {
    let output = shart(&[
        "listen",
        "/nonexistent/ttyUSB9",
        "--retry-interval",
        "10ms",
        "--max-attempts",
        "2",
    ]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("after 2 attempts"));
}

#[test]
fn listen_rejects_unsupported_baud() {
    let output = shart(&["listen", "/nonexistent/ttyUSB9", "--baud", "12345"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_prints_package_version() {
    let output = shart(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("shart {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn envinfo_json_has_environment() {
    let output = shart(&["--format", "json", "envinfo"]);
    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("envinfo output should be JSON");
    assert!(value["environment"]
        .as_object()
        .unwrap()
        .contains_key("SHART_REGISTRY"));
}

#[test]
fn extended_version_as_json() {
    let output = shart(&["--format", "json", "version", "--extended"]);
    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("extended version should be JSON");
    assert_eq!(value["name"], "shart");
    assert_eq!(value["profiles"][2], "sd-log");
}
