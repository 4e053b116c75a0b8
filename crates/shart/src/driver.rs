//! Poll loop that pulls frames from a reader and hands packets to a sink.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use shart_frame::{
    decode_frame, ByteSource, Frame, FrameError, FrameReader, FrameResult, FrameWriter,
};
use shart_schema::{tag_name, DecodedPacket};
use tracing::{debug, info};

/// Settings for [`StreamDriver::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Sleep between polls while a streamed source has too few bytes ready.
    pub poll_interval: Duration,
    /// Stop after this many valid packets.
    pub max_packets: Option<usize>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5),
            max_packets: None,
        }
    }
}

/// Errors that end a driver run.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Reading, decoding or mirroring failed.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The packet sink failed to accept a packet.
    #[error("packet sink failed: {0}")]
    Sink(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DriverError>;

/// Receives every valid packet the driver reads.
pub trait PacketSink {
    /// Handle one packet. `name` is the registered name of its tag.
    fn accept(
        &mut self,
        name: &str,
        frame: &Frame,
        packet: &DecodedPacket,
    ) -> std::io::Result<()>;

    /// Called once when the run ends, however it ends.
    fn finish(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl PacketSink for Vec<DecodedPacket> {
    fn accept(
        &mut self,
        _name: &str,
        _frame: &Frame,
        packet: &DecodedPacket,
    ) -> std::io::Result<()> {
        self.push(packet.clone());
        Ok(())
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Truncated,
    CountReached,
    Cancelled,
}

/// Outcome of a single [`StreamDriver::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A frame or byte was consumed.
    Progress,
    /// Not enough data ready yet.
    Idle,
    /// The run is over.
    Stop(StopReason),
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub packets: usize,
    pub checksum_failures: usize,
    pub unknown_tags: usize,
    pub skipped_bytes: usize,
    pub truncated: usize,
    pub idle_polls: usize,
    pub elapsed: Duration,
}

impl DriverStats {
    /// Frames that were found but could not be delivered.
    pub fn failures(&self) -> usize {
        self.checksum_failures + self.unknown_tags
    }
}

/// Drives a [`FrameReader`], optionally mirroring raw frames to a writer.
pub struct StreamDriver<S, M = std::io::Sink> {
    reader: FrameReader<S>,
    mirror: Option<FrameWriter<M>>,
    config: DriverConfig,
    stats: DriverStats,
}

impl<S: ByteSource> StreamDriver<S> {
    pub fn new(reader: FrameReader<S>, config: DriverConfig) -> Self {
        Self {
            reader,
            mirror: None,
            config,
            stats: DriverStats::default(),
        }
    }
}

impl<S: ByteSource, M: Write> StreamDriver<S, M> {
    /// Create a driver that writes every complete frame it reads, valid or
    /// not, to `mirror` exactly as received.
    pub fn with_mirror(
        reader: FrameReader<S>,
        mirror: FrameWriter<M>,
        config: DriverConfig,
    ) -> Self {
        Self {
            reader,
            mirror: Some(mirror),
            config,
            stats: DriverStats::default(),
        }
    }

    /// Perform one read attempt and route its outcome.
    pub fn step(&mut self, sink: &mut impl PacketSink) -> Result<Step> {
        if self
            .config
            .max_packets
            .is_some_and(|max| self.stats.packets >= max)
        {
            return Ok(Step::Stop(StopReason::CountReached));
        }

        let step = match self.reader.try_read_frame()? {
            FrameResult::Ok(frame) => {
                self.mirror(&frame)?;
                let packet = decode_frame(self.reader.registry(), &frame)?;
                let name = self
                    .reader
                    .registry()
                    .name(frame.tag)
                    .unwrap_or_else(|| tag_name(frame.tag));
                sink.accept(name, &frame, &packet)
                    .map_err(DriverError::Sink)?;
                self.stats.packets += 1;
                Step::Progress
            }
            FrameResult::ChecksumMismatch { frame, .. } => {
                self.mirror(&frame)?;
                self.stats.checksum_failures += 1;
                Step::Progress
            }
            FrameResult::UnknownPacketType(_) => {
                self.stats.unknown_tags += 1;
                Step::Progress
            }
            FrameResult::Skipped(_) => {
                self.stats.skipped_bytes += 1;
                Step::Progress
            }
            FrameResult::NoDataAvailable => {
                self.stats.idle_polls += 1;
                Step::Idle
            }
            FrameResult::EndOfStream => Step::Stop(StopReason::EndOfStream),
            FrameResult::Truncated {
                tag,
                expected,
                read,
            } => {
                debug!(?tag, expected, read, "stream ended inside a frame");
                self.stats.truncated += 1;
                Step::Stop(StopReason::Truncated)
            }
        };
        Ok(step)
    }

    /// Step until the source ends, the packet limit is reached, or `running`
    /// is cleared.
    pub fn run(
        &mut self,
        sink: &mut impl PacketSink,
        running: &AtomicBool,
    ) -> Result<StopReason> {
        let started = Instant::now();
        let outcome = self.run_loop(sink, running);
        self.stats.elapsed += started.elapsed();

        let finished = sink.finish().map_err(DriverError::Sink);
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.flush()?;
        }
        let reason = outcome?;
        finished?;

        info!(
            packets = self.stats.packets,
            failures = self.stats.failures(),
            skipped = self.stats.skipped_bytes,
            elapsed_ms = self.stats.elapsed.as_millis() as u64,
            reason = ?reason,
            "stream finished"
        );
        Ok(reason)
    }

    fn run_loop(
        &mut self,
        sink: &mut impl PacketSink,
        running: &AtomicBool,
    ) -> Result<StopReason> {
        loop {
            if !running.load(Ordering::SeqCst) {
                return Ok(StopReason::Cancelled);
            }
            match self.step(sink)? {
                Step::Progress => {}
                Step::Idle => std::thread::sleep(self.config.poll_interval),
                Step::Stop(reason) => return Ok(reason),
            }
        }
    }

    fn mirror(&mut self, frame: &Frame) -> Result<()> {
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.write_frame(frame)?;
        }
        Ok(())
    }

    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }

    pub fn reader(&self) -> &FrameReader<S> {
        &self.reader
    }

    /// Consume the driver, returning the reader and the mirror writer.
    pub fn into_parts(self) -> (FrameReader<S>, Option<FrameWriter<M>>) {
        (self.reader, self.mirror)
    }
}
