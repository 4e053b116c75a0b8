use std::sync::Arc;

use bytes::BytesMut;
use shart_schema::{DecodedPacket, PacketRegistry, PacketTag};
use tracing::{debug, trace, warn};

use crate::checksum::{compute, ChecksumPair};
use crate::codec::{Frame, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::source::ByteSource;

/// Outcome of a single frame read attempt.
///
/// Every call yields exactly one outcome describing only what happened during
/// that call. Only [`FrameResult::Ok`] carries data.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameResult<T = Frame> {
    /// A complete frame with a valid checksum.
    Ok(T),
    /// A streamed source has fewer bytes ready than the configured threshold.
    /// Nothing was consumed.
    NoDataAvailable,
    /// The source is exhausted at a frame boundary.
    EndOfStream,
    /// One non-sync byte was consumed and dropped.
    Skipped(u8),
    /// Sync and tag were consumed but the tag has no registered layout.
    /// Nothing past the tag was consumed.
    UnknownPacketType(PacketTag),
    /// A complete frame was read but its checksum does not match the payload.
    ChecksumMismatch { frame: Frame, computed: ChecksumPair },
    /// The source ended partway through a frame.
    Truncated {
        /// Tag, if it was read.
        tag: Option<PacketTag>,
        /// Full frame size in bytes (header only if the tag is unknown).
        expected: usize,
        /// Frame bytes read before the source ended, sync included.
        read: usize,
    },
}

impl<T> FrameResult<T> {
    /// Transform the payload of an `Ok` outcome.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FrameResult<U> {
        match self.try_map(|value| Ok::<U, std::convert::Infallible>(f(value))) {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    /// Transform the payload of an `Ok` outcome with a fallible function.
    pub fn try_map<U, E>(
        self,
        f: impl FnOnce(T) -> std::result::Result<U, E>,
    ) -> std::result::Result<FrameResult<U>, E> {
        Ok(match self {
            FrameResult::Ok(value) => FrameResult::Ok(f(value)?),
            FrameResult::NoDataAvailable => FrameResult::NoDataAvailable,
            FrameResult::EndOfStream => FrameResult::EndOfStream,
            FrameResult::Skipped(byte) => FrameResult::Skipped(byte),
            FrameResult::UnknownPacketType(tag) => FrameResult::UnknownPacketType(tag),
            FrameResult::ChecksumMismatch { frame, computed } => {
                FrameResult::ChecksumMismatch { frame, computed }
            }
            FrameResult::Truncated {
                tag,
                expected,
                read,
            } => FrameResult::Truncated {
                tag,
                expected,
                read,
            },
        })
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, FrameResult::Ok(_))
    }

    /// Whether the source can yield no further frames.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FrameResult::EndOfStream | FrameResult::Truncated { .. }
        )
    }

    /// Short name of the outcome, for logs and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            FrameResult::Ok(_) => "ok",
            FrameResult::NoDataAvailable => "no-data",
            FrameResult::EndOfStream => "end-of-stream",
            FrameResult::Skipped(_) => "skipped",
            FrameResult::UnknownPacketType(_) => "unknown-type",
            FrameResult::ChecksumMismatch { .. } => "checksum-mismatch",
            FrameResult::Truncated { .. } => "truncated",
        }
    }
}

/// Reads sync-framed packets from a [`ByteSource`].
///
/// The reader never loops internally: each call consumes at most one frame
/// (or one stray byte) and reports what happened. Callers resynchronize by
/// calling again.
pub struct FrameReader<S> {
    inner: S,
    registry: Arc<PacketRegistry>,
    config: FrameConfig,
}

impl<S: ByteSource> FrameReader<S> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: S, registry: Arc<PacketRegistry>) -> Self {
        Self::with_config(inner, registry, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: S, registry: Arc<PacketRegistry>, config: FrameConfig) -> Self {
        Self {
            inner,
            registry,
            config,
        }
    }

    /// Attempt to read one frame.
    ///
    /// An unregistered tag consumes only the sync and tag bytes; its payload
    /// length is unknowable, so the next call resumes scanning from the byte
    /// after the tag.
    pub fn try_read_frame(&mut self) -> Result<FrameResult> {
        if let Some(ready) = self.inner.bytes_ready()? {
            if ready < self.config.ready_threshold {
                return Ok(FrameResult::NoDataAvailable);
            }
        }

        let mut byte = [0u8; 1];
        if self.inner.read_exact(&mut byte)? == 0 {
            return Ok(FrameResult::EndOfStream);
        }
        if byte[0] != self.config.sync_byte {
            trace!(byte = byte[0], "dropping non-sync byte");
            return Ok(FrameResult::Skipped(byte[0]));
        }

        if self.inner.read_exact(&mut byte)? == 0 {
            return Ok(FrameResult::Truncated {
                tag: None,
                expected: HEADER_SIZE,
                read: 1,
            });
        }
        let tag = byte[0];

        let payload_length = match self.registry.lookup(tag) {
            Some(spec) => spec.payload_length(),
            None => {
                warn!(tag, "unregistered packet type");
                return Ok(FrameResult::UnknownPacketType(tag));
            }
        };
        let expected = HEADER_SIZE + payload_length;

        let mut sums = [0u8; 2];
        let read = self.inner.read_exact(&mut sums)?;
        if read < sums.len() {
            return Ok(FrameResult::Truncated {
                tag: Some(tag),
                expected,
                read: 2 + read,
            });
        }

        let mut payload = BytesMut::zeroed(payload_length);
        let read = self.inner.read_exact(&mut payload)?;
        if read < payload_length {
            return Ok(FrameResult::Truncated {
                tag: Some(tag),
                expected,
                read: HEADER_SIZE + read,
            });
        }

        let frame = Frame {
            tag,
            checksum: ChecksumPair::new(sums[0], sums[1]),
            payload: payload.freeze(),
        };

        let computed = compute(&frame.payload);
        if computed != frame.checksum {
            warn!(
                tag,
                expected = %frame.checksum,
                %computed,
                "checksum mismatch"
            );
            return Ok(FrameResult::ChecksumMismatch { frame, computed });
        }

        debug!(tag, size = frame.wire_size(), "frame read");
        Ok(FrameResult::Ok(frame))
    }

    /// Attempt to read one frame and decode its payload.
    ///
    /// Returns `Err(FrameError::Schema(_))` only if a validated payload does
    /// not fit its layout, which indicates a broken registry.
    pub fn try_read_packet(&mut self) -> Result<FrameResult<DecodedPacket>> {
        let registry = Arc::clone(&self.registry);
        self.try_read_frame()?
            .try_map(|frame| decode_frame(&registry, &frame))
    }

    /// The registry used to resolve tags.
    pub fn registry(&self) -> &Arc<PacketRegistry> {
        &self.registry
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

/// Decode a validated frame's payload with its registered layout.
pub fn decode_frame(registry: &PacketRegistry, frame: &Frame) -> Result<DecodedPacket> {
    let spec = registry
        .lookup(frame.tag)
        .ok_or(FrameError::UnregisteredTag(frame.tag))?;
    Ok(DecodedPacket::decode(frame.tag, spec, &frame.payload)?)
}
