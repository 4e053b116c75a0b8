#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use bytes::BytesMut;
use shart::frame::{encode_frame, SYNC_BYTE};
use shart::schema::{GPS, SENSOR};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/shartcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

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

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut wire = BytesMut::new();
    encode_frame(SYNC_BYTE, tag, payload, &mut wire);
    wire.to_vec()
}

fn sensor_payload(timestamp: u32) -> Vec<u8> {
    let mut payload = timestamp.to_le_bytes().to_vec();
    for raw in [10i16, -20, 1024, 1, 2, 3] {
        payload.extend(raw.to_le_bytes());
    }
    for value in [1.5f32, 0.0, 0.0, 21.0, 101_325.0] {
        payload.extend(value.to_le_bytes());
    }
    for raw in [4i16, 5, 6] {
        payload.extend(raw.to_le_bytes());
    }
    payload.extend([1u8, 0]);
    assert_eq!(payload.len(), 44);
    payload
}

fn gps_payload(timestamp: u32) -> Vec<u8> {
    let mut payload = vec![0u8; 52];
    payload[..4].copy_from_slice(&timestamp.to_le_bytes());
    payload
}

/// Noise, a sensor frame, a corrupted GPS frame, an unknown tag, a GPS frame.
fn write_capture(dir: &Path) -> PathBuf {
    let mut capture = vec![0x00, 0x13, 0x37];
    capture.extend(frame(SENSOR, &sensor_payload(1000)));
    let mut corrupted = frame(GPS, &gps_payload(1500));
    corrupted[3] ^= 0x40;
    capture.extend(corrupted);
    capture.extend([SYNC_BYTE, 0x51]);
    capture.extend(frame(GPS, &gps_payload(2000)));

    let path = dir.join("flight.shart");
    std::fs::write(&path, capture).expect("capture should be writable");
    path
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect()
}

#[test]
fn read_decodes_valid_packets_and_skips_damage() {
    let dir = unique_temp_dir("read");
    let capture = write_capture(&dir);

    let output = shart(&["--format", "json", "read", capture.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let packets = json_lines(&output);
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0]["name"], "sensor");
    assert_eq!(packets[0]["fields"][0], 1000);
    assert_eq!(packets[0]["fields"][3], 1024);
    assert_eq!(packets[1]["name"], "gps");
    assert_eq!(packets[1]["fields"][0], 2000);
    assert_eq!(packets[1]["fields"].as_array().unwrap().len(), 16);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn read_honors_count_and_imu() {
    let dir = unique_temp_dir("count");
    let capture = write_capture(&dir);

    let output = shart(&[
        "--format",
        "json",
        "read",
        capture.to_str().unwrap(),
        "--count",
        "1",
        "--imu",
    ]);
    assert!(output.status.success());

    let packets = json_lines(&output);
    assert_eq!(packets.len(), 1);
    let az = packets[0]["imu"]["accel"][2].as_f64().unwrap();
    assert!((az - 1024.0 * 0.976 * 9.80665 / 1000.0).abs() < 1e-9);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn read_csv_output() {
    let dir = unique_temp_dir("csv");
    let capture = write_capture(&dir);

    let output = shart(&["--format", "csv", "read", capture.to_str().unwrap()]);
    assert!(output.status.success());

    let text = String::from_utf8_lossy(&output.stdout);
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("sensor,0x0b,1000,10,-20,1024,"));
    assert!(rows[1].starts_with("gps,0xca,2000,"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn wrong_profile_finds_nothing_but_succeeds() {
    let dir = unique_temp_dir("profile");
    let path = dir.join("telemetry.shart");
    std::fs::write(&path, frame(SENSOR, &sensor_payload(7))).unwrap();

    // The legacy sensor layout is 60 bytes; the 44-byte frame is truncated.
    let output = shart(&[
        "--format",
        "json",
        "--profile",
        "legacy",
        "read",
        path.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert!(json_lines(&output).is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn custom_registry_file_decodes_custom_tag() {
    let dir = unique_temp_dir("registry");
    let registry = dir.join("layouts.json");
    std::fs::write(
        &registry,
        r#"{"packets":[{"tag":"0x42","name":"baro","payload_length":6,"format":"<Ih"}]}"#,
    )
    .unwrap();

    let mut payload = 99u32.to_le_bytes().to_vec();
    payload.extend((-12i16).to_le_bytes());
    let capture = dir.join("baro.shart");
    std::fs::write(&capture, frame(0x42, &payload)).unwrap();

    let output = shart(&[
        "--format",
        "json",
        "--registry",
        registry.to_str().unwrap(),
        "read",
        capture.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let packets = json_lines(&output);
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0]["name"], "baro");
    assert_eq!(packets[0]["fields"], serde_json::json!([99, -12]));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_registry_file_is_data_invalid() {
    let dir = unique_temp_dir("bad-registry");
    let registry = dir.join("layouts.json");
    std::fs::write(
        &registry,
        r#"{"packets":[{"tag":1,"payload_length":5,"format":"<I"}]}"#,
    )
    .unwrap();

    let output = shart(&["--registry", registry.to_str().unwrap(), "registry"]);
    assert_eq!(output.status.code(), Some(60));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_capture_file_fails() {
    let output = shart(&["read", "/nonexistent/shart/capture.bin"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed opening"));
}
