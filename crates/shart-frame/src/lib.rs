//! Sync-byte framing and checksum validation for shart telemetry.
//!
//! Every frame on the wire is:
//! - A 1-byte sync marker (`0xAA` by default)
//! - A 1-byte packet tag
//! - Two checksum bytes computed over the payload
//! - A payload whose fixed length comes from the tag's registered layout
//!
//! Frames carry no length field, so a tag missing from the
//! [`shart_schema::PacketRegistry`] cannot be skipped as a unit. The
//! [`FrameReader`] reports one outcome per call and resynchronizes byte by
//! byte.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod reader;
pub mod source;
pub mod writer;

pub use checksum::{compute as compute_checksum, ChecksumPair};
pub use codec::{
    encode_frame, encode_raw, Frame, FrameConfig, DEFAULT_READY_THRESHOLD, HEADER_SIZE, SYNC_BYTE,
};
pub use error::{FrameError, Result};
pub use reader::{decode_frame, FrameReader, FrameResult};
pub use source::{ByteSource, FileSource, StreamSource, DEFAULT_WAIT_INTERVAL};
pub use writer::FrameWriter;
