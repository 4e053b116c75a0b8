//! Raw IMU counts to SI units.
//!
//! Scale factors match the LSM6DSO32 ranges the flight firmware configures:
//! ±32 g accelerometer and 2000 dps gyroscope.

use serde::Serialize;
use shart_schema::{DecodedPacket, FieldValue};

/// Accelerometer sensitivity in mg per LSB.
pub const ACCEL_MG_PER_LSB: f64 = 0.976;
/// Gyroscope sensitivity in mdps per LSB.
pub const GYRO_MDPS_PER_LSB: f64 = 70.0;

const STANDARD_GRAVITY: f64 = 9.80665;
const DEG_TO_RAD: f64 = 0.017453293;

/// Convert a raw accelerometer count to m/s².
pub fn accel_ms2(raw: i16) -> f64 {
    f64::from(raw) * ACCEL_MG_PER_LSB * STANDARD_GRAVITY / 1000.0
}

/// Convert a raw gyroscope count to rad/s.
pub fn gyro_rads(raw: i16) -> f64 {
    f64::from(raw) * GYRO_MDPS_PER_LSB * DEG_TO_RAD / 1000.0
}

/// Converted accelerometer and gyroscope axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImuReading {
    /// x, y, z in m/s².
    pub accel: [f64; 3],
    /// x, y, z in rad/s.
    pub gyro: [f64; 3],
}

impl ImuReading {
    pub fn from_raw(accel: [i16; 3], gyro: [i16; 3]) -> Self {
        Self {
            accel: accel.map(accel_ms2),
            gyro: gyro.map(gyro_rads),
        }
    }

    /// Convert fields 1..=6 of a sensor packet, if they are raw i16 counts.
    ///
    /// Only the telemetry layout carries raw counts; layouts that log
    /// already-converted floats yield `None`.
    pub fn from_packet(packet: &DecodedPacket) -> Option<Self> {
        let mut raw = [0i16; 6];
        for (slot, value) in raw.iter_mut().zip(packet.fields.get(1..7)?) {
            match value {
                FieldValue::I16(v) => *slot = *v,
                _ => return None,
            }
        }
        Some(Self::from_raw(
            [raw[0], raw[1], raw[2]],
            [raw[3], raw[4], raw[5]],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn one_g_worth_of_counts() {
        // 1024 counts * 0.976 mg = 0.999424 g
        assert!(close(accel_ms2(1024), 1024.0 * 0.976 * 9.80665 / 1000.0));
        assert!(close(accel_ms2(0), 0.0));
        assert!(accel_ms2(-1024) < 0.0);
    }

    #[test]
    fn gyro_counts_to_rad_per_second() {
        assert!(close(gyro_rads(1000), 1000.0 * 70.0 * 0.017453293 / 1000.0));
        assert!(close(gyro_rads(-1), -70.0 * 0.017453293 / 1000.0));
    }

    #[test]
    fn from_telemetry_sensor_packet() {
        let mut fields = vec![FieldValue::U32(10)];
        fields.extend([100i16, -100, 1024, 10, 20, -30].map(FieldValue::I16));
        fields.extend([0.0f32; 5].map(FieldValue::F32));
        let packet = DecodedPacket { tag: 0x0B, fields };

        let reading = ImuReading::from_packet(&packet).unwrap();
        assert!(close(reading.accel[2], accel_ms2(1024)));
        assert!(close(reading.gyro[2], gyro_rads(-30)));
    }

    #[test]
    fn float_layouts_are_not_converted() {
        let mut fields = vec![FieldValue::U32(10)];
        fields.extend([1.0f32; 11].map(FieldValue::F32));
        let packet = DecodedPacket { tag: 0x0B, fields };
        assert_eq!(ImuReading::from_packet(&packet), None);

        let short = DecodedPacket {
            tag: 0x0B,
            fields: vec![FieldValue::U32(1), FieldValue::I16(2)],
        };
        assert_eq!(ImuReading::from_packet(&short), None);
    }
}
