use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use shart_schema::{encode, FieldValue, PacketRegistry, PacketTag};
use tracing::debug;

use crate::codec::{encode_frame, encode_raw, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Writes complete frames to any `Write` sink.
///
/// Used both to send commands to a device and to mirror received frames
/// into a capture file.
pub struct FrameWriter<W> {
    inner: W,
    buf: BytesMut,
    config: FrameConfig,
}

impl<W: Write> FrameWriter<W> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: W) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: W, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and send a payload, computing its checksum.
    pub fn send(&mut self, tag: PacketTag, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(self.config.sync_byte, tag, payload, &mut self.buf);
        self.write_buffered()
    }

    /// Write a frame verbatim, keeping the checksum it carries.
    ///
    /// A frame that failed validation is mirrored exactly as received.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.buf.clear();
        encode_raw(
            self.config.sync_byte,
            frame.tag,
            frame.checksum,
            &frame.payload,
            &mut self.buf,
        );
        self.write_buffered()
    }

    /// Encode typed values with the tag's registered layout and send them.
    pub fn send_packet(
        &mut self,
        registry: &PacketRegistry,
        tag: PacketTag,
        values: &[FieldValue],
    ) -> Result<()> {
        let spec = registry
            .lookup(tag)
            .ok_or(FrameError::UnregisteredTag(tag))?;
        let payload = encode(spec, values)?;
        self.send(tag, &payload)
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut remaining = &self.buf[..];
        while !remaining.is_empty() {
            let n = retry_transient(|| self.inner.write(remaining))?;
            if n == 0 {
                return Err(FrameError::SinkClosed);
            }
            remaining = &remaining[n..];
        }
        debug!(size = self.buf.len(), "frame written");

        self.flush()
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        Ok(retry_transient(|| self.inner.flush())?)
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

/// Repeat `op` while it fails with `Interrupted` or `WouldBlock`.
fn retry_transient<T>(mut op: impl FnMut() -> std::io::Result<T>) -> std::io::Result<T> {
    loop {
        match op() {
            Err(err) if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                std::thread::yield_now();
            }
            other => return other,
        }
    }
}
