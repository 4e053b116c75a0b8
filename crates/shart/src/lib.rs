//! Decoder for shart rocket telemetry packets.
//!
//! The flight computer streams sync-framed, checksummed binary packets over a
//! radio or USB serial link and logs the same frames to SD. This crate reads
//! either source and turns frames into typed field tuples.
//!
//! # Crate Structure
//!
//! - [`schema`]: Packet layouts, built-in profiles and the tag registry
//! - [`frame`]: Sync-byte framing, checksums and the non-blocking frame reader
//! - [`transport`]: Raw-mode serial devices with open-retry (Unix)
//! - [`driver`]: Poll loop routing packets to a sink, with raw mirroring
//! - [`imu`]: Raw IMU count conversion

pub mod driver;
pub mod imu;

/// Re-export schema types.
pub mod schema {
    pub use shart_schema::*;
}

/// Re-export frame types.
pub mod frame {
    pub use shart_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use shart_transport::*;
}
