//! Packet layout registry and typed payload decoding for shart telemetry.
//!
//! A [`PacketRegistry`] maps one-byte packet tags to fixed [`PacketSpec`]
//! layouts. Layouts differ between deployments, so registries are built from
//! a built-in [`Profile`] or loaded from a JSON file rather than hardcoded.
//! The [`decoder`] turns validated payloads into raw [`FieldValue`] tuples.

pub mod config;
pub mod decoder;
pub mod error;
pub mod field;
pub mod profile;
pub mod registry;
pub mod spec;

pub use config::RegistryConfig;
pub use decoder::{decode, encode, DecodedPacket};
pub use error::{Result, SchemaError};
pub use field::{FieldKind, FieldValue};
pub use profile::{tag_name, Profile, COMMAND, GPS, SENSOR, START_COMMAND, STOP_COMMAND};
pub use registry::{parse_tag, PacketRegistry};
pub use spec::{parse_format, PacketSpec, PacketTag, MAX_LAYOUT_WIDTH};
