//! Well-known packet tags and the built-in deployment profiles.
//!
//! The sensor layout differs between deployments, so there is no single
//! canonical registry. Pick the profile matching the firmware that produced
//! the stream, or load a registry file.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SchemaError};
use crate::registry::PacketRegistry;
use crate::spec::{PacketSpec, PacketTag};

/// IMU, magnetometer and barometer sample.
pub const SENSOR: PacketTag = 0x0B;

/// GPS navigation solution.
pub const GPS: PacketTag = 0xCA;

/// Ground-to-vehicle command.
pub const COMMAND: PacketTag = 0xA5;

/// `COMMAND` value that starts logging on the vehicle.
pub const START_COMMAND: i32 = 0x6D65_6F77;

/// `COMMAND` value that stops logging on the vehicle.
pub const STOP_COMMAND: i32 = 0x6D69_6175;

/// GPS layout: time, lat/lon/alt, NED velocity, eph/epv/sacc, ground speed,
/// pdop, nsats/fix/valid/flags.
pub const GPS_FORMAT: &str = "<I6i3Iif4B";
pub const GPS_PAYLOAD_LENGTH: usize = 52;

pub const COMMAND_FORMAT: &str = "<i";
pub const COMMAND_PAYLOAD_LENGTH: usize = 4;

/// Returns a human-readable name for a well-known tag.
pub fn tag_name(tag: PacketTag) -> &'static str {
    match tag {
        SENSOR => "SENSOR",
        GPS => "GPS",
        COMMAND => "COMMAND",
        _ => "UNKNOWN",
    }
}

/// Built-in registry for one deployment's firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    /// Current flight firmware over the radio link: raw i16 IMU, float
    /// magnetometer/baro, ADXL accel, status byte. 44-byte sensor payload.
    #[default]
    Telemetry,
    /// Early bench build: i32 IMU, floats for everything else. 60 bytes.
    Legacy,
    /// SD-card capture layout: floats first, then i16 ADXL accel. 56 bytes.
    SdLog,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Telemetry, Profile::Legacy, Profile::SdLog];

    pub fn name(self) -> &'static str {
        match self {
            Profile::Telemetry => "telemetry",
            Profile::Legacy => "legacy",
            Profile::SdLog => "sd-log",
        }
    }

    /// `(payload_length, format)` of this profile's sensor packet.
    pub fn sensor_layout(self) -> (usize, &'static str) {
        match self {
            Profile::Telemetry => (44, "<I6h5f3h2B"),
            Profile::Legacy => (60, "<I3i11f"),
            Profile::SdLog => (56, "<I11f3h2B"),
        }
    }

    /// Build the registry for this profile.
    pub fn registry(self) -> Result<PacketRegistry> {
        let (sensor_length, sensor_format) = self.sensor_layout();

        let mut registry = PacketRegistry::new();
        registry.register(
            SENSOR,
            "sensor",
            PacketSpec::from_format(sensor_length, sensor_format)?,
        )?;
        registry.register(
            GPS,
            "gps",
            PacketSpec::from_format(GPS_PAYLOAD_LENGTH, GPS_FORMAT)?,
        )?;
        registry.register(
            COMMAND,
            "command",
            PacketSpec::from_format(COMMAND_PAYLOAD_LENGTH, COMMAND_FORMAT)?,
        )?;
        Ok(registry)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = SchemaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "telemetry" => Ok(Profile::Telemetry),
            "legacy" => Ok(Profile::Legacy),
            "sd-log" | "sdlog" => Ok(Profile::SdLog),
            other => Err(SchemaError::LoadFailed(format!("unknown profile: {other}"))),
        }
    }
}
