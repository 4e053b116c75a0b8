//! Byte sources the frame reader pulls from.
//!
//! A capture file and a live peripheral look the same to the reader except
//! for readiness: live sources can say how many bytes are waiting, files
//! cannot and simply block until EOF.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tracing::trace;

const READ_CHUNK_SIZE: usize = 4 * 1024;
const DEFAULT_MAX_BUFFERED: usize = 64 * 1024;

/// Sleep between reads while a partially received frame is still arriving.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_millis(1);

/// Sequential byte source with an optional readiness check.
pub trait ByteSource {
    /// Fill `buf` completely, blocking as needed.
    ///
    /// Returns the number of bytes written into `buf`. A value smaller than
    /// `buf.len()` means the source is exhausted.
    fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Number of bytes that can be read without waiting, or `None` when the
    /// source has no readiness concept (files, exhausted streams).
    fn bytes_ready(&mut self) -> std::io::Result<Option<usize>> {
        Ok(None)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        (**self).read_exact(buf)
    }

    fn bytes_ready(&mut self) -> std::io::Result<Option<usize>> {
        (**self).bytes_ready()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        (**self).read_exact(buf)
    }

    fn bytes_ready(&mut self) -> std::io::Result<Option<usize>> {
        (**self).bytes_ready()
    }
}

/// Blocking source over any reader, typically a capture file.
#[derive(Debug)]
pub struct FileSource<R> {
    inner: R,
}

impl FileSource<BufReader<File>> {
    /// Open a capture file for buffered reading.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read> FileSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for FileSource<R> {
    fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(filled)
    }
}

/// Buffered source over a non-blocking reader, such as a serial device.
///
/// [`ByteSource::bytes_ready`] drains whatever the reader has available
/// without waiting. Once the reader reports EOF the source stops reporting
/// readiness, so the remaining buffered bytes drain like a file.
#[derive(Debug)]
pub struct StreamSource<R> {
    inner: R,
    buf: BytesMut,
    max_buffered: usize,
    wait_interval: Duration,
    eof: bool,
}

impl<R: Read> StreamSource<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_buffered(inner, DEFAULT_MAX_BUFFERED)
    }

    /// Limit how many bytes a readiness check buffers ahead.
    pub fn with_max_buffered(inner: R, max_buffered: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            max_buffered: max_buffered.max(1),
            wait_interval: DEFAULT_WAIT_INTERVAL,
            eof: false,
        }
    }

    /// How long [`ByteSource::read_exact`] sleeps each time the reader
    /// would block mid-read.
    pub fn with_wait_interval(mut self, interval: Duration) -> Self {
        self.wait_interval = interval;
        self
    }

    /// Bytes currently held in the internal buffer.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Whether the underlying reader has reported EOF.
    pub fn is_closed(&self) -> bool {
        self.eof
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Read one chunk. `Ok(false)` means the reader would block.
    fn read_chunk(&mut self) -> std::io::Result<bool> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    trace!("stream source reached EOF");
                    self.eof = true;
                    return Ok(true);
                }
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(true);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(false),
                Err(err) => return Err(err),
            }
        }
    }

    fn pump(&mut self) -> std::io::Result<()> {
        while !self.eof && self.buf.len() < self.max_buffered {
            if !self.read_chunk()? {
                break;
            }
        }
        Ok(())
    }
}

impl<R: Read> ByteSource for StreamSource<R> {
    fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while self.buf.len() < buf.len() && !self.eof {
            if !self.read_chunk()? {
                std::thread::sleep(self.wait_interval);
            }
        }

        let n = buf.len().min(self.buf.len());
        buf[..n].copy_from_slice(&self.buf[..n]);
        self.buf.advance(n);
        Ok(n)
    }

    fn bytes_ready(&mut self) -> std::io::Result<Option<usize>> {
        self.pump()?;
        if self.eof {
            Ok(None)
        } else {
            Ok(Some(self.buf.len()))
        }
    }
}
