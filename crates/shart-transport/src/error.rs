use std::path::PathBuf;

/// Errors that can occur while opening or using a serial device.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The device could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The device opened but could not be put into raw mode.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The requested baud rate has no termios speed constant.
    #[error("unsupported baud rate {0}")]
    UnsupportedBaud(u32),

    /// The device never became available within the attempt limit.
    #[error("gave up opening {path} after {attempts} attempts: {source}")]
    RetriesExhausted {
        path: PathBuf,
        attempts: u32,
        source: std::io::Error,
    },

    /// Retrying was stopped by the caller before the device appeared.
    #[error("stopped waiting for {path}")]
    Cancelled { path: PathBuf },

    /// An I/O error occurred on an open device.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// The underlying I/O error, if any.
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            TransportError::Open { source, .. }
            | TransportError::Configure { source, .. }
            | TransportError::RetriesExhausted { source, .. } => Some(source),
            TransportError::Io(err) => Some(err),
            TransportError::UnsupportedBaud(_) | TransportError::Cancelled { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
