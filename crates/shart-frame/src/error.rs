use shart_schema::SchemaError;

/// Errors that can occur while reading or writing frames.
///
/// Per-frame protocol outcomes (bad checksum, unknown tag, truncation) are
/// reported through [`crate::FrameResult`], not here.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An I/O error occurred on the byte source or sink.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The registry and the payload disagree, or typed values do not fit the layout.
    #[error("layout error: {0}")]
    Schema(#[from] SchemaError),

    /// A packet was sent for a tag with no registered layout.
    #[error("packet tag 0x{0:02X} is not registered")]
    UnregisteredTag(u8),

    /// The sink accepted zero bytes.
    #[error("sink closed while writing frame")]
    SinkClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
