use bytes::{BufMut, Bytes, BytesMut};
use shart_schema::PacketTag;

use crate::checksum::{compute, ChecksumPair};

/// Frame header: sync (1) + tag (1) + checksum a (1) + checksum b (1) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Default synchronization byte.
pub const SYNC_BYTE: u8 = 0xAA;

/// Default number of buffered bytes a streamed source must report before a
/// read attempt is made.
pub const DEFAULT_READY_THRESHOLD: usize = 100;

/// A raw frame: header fields plus the payload exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Packet type tag.
    pub tag: PacketTag,
    /// Checksum bytes carried in the header.
    pub checksum: ChecksumPair,
    /// Payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame with the checksum computed over `payload`.
    pub fn new(tag: PacketTag, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        Self {
            tag,
            checksum: compute(&payload),
            payload,
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Whether the carried checksum matches the payload.
    pub fn is_valid(&self) -> bool {
        compute(&self.payload) == self.checksum
    }
}

/// Encode a frame into the wire format, computing the checksum.
///
/// Wire format:
/// ```text
/// ┌────────┬────────┬────────┬────────┬──────────────────────┐
/// │ Sync   │ Tag    │ Sum a  │ Sum b  │ Payload              │
/// │ 0xAA   │ (1B)   │ (1B)   │ (1B)   │ (fixed per tag, LE)  │
/// └────────┴────────┴────────┴────────┴──────────────────────┘
/// ```
pub fn encode_frame(sync: u8, tag: PacketTag, payload: &[u8], dst: &mut BytesMut) {
    encode_raw(sync, tag, compute(payload), payload, dst);
}

/// Encode header and payload verbatim, keeping the given checksum.
pub fn encode_raw(
    sync: u8,
    tag: PacketTag,
    checksum: ChecksumPair,
    payload: &[u8],
    dst: &mut BytesMut,
) {
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u8(sync);
    dst.put_u8(tag);
    dst.put_u8(checksum.a);
    dst.put_u8(checksum.b);
    dst.put_slice(payload);
}

/// Configuration for frame reading and writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Byte marking the start of every frame. Default: `0xAA`.
    pub sync_byte: u8,
    /// Streamed sources must report at least this many ready bytes before a
    /// read attempt; fewer yields `NoDataAvailable`. Ignored for file sources.
    pub ready_threshold: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            sync_byte: SYNC_BYTE,
            ready_threshold: DEFAULT_READY_THRESHOLD,
        }
    }
}
