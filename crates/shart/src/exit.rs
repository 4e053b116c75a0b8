use std::fmt;
use std::io;

use shart::driver::DriverError;
use shart::frame::FrameError;
use shart::schema::SchemaError;
#[cfg(unix)]
use shart::transport::TransportError;

// Exit codes. USAGE matches EX_USAGE from sysexits(3).
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(unix)]
pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
        TransportError::UnsupportedBaud(_) => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::Cancelled { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn schema_error(context: &str, err: SchemaError) -> CliError {
    match err {
        SchemaError::LoadFailed(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::Schema(err) => schema_error(context, err),
        FrameError::UnregisteredTag(_) => CliError::new(USAGE, format!("{context}: {err}")),
        FrameError::SinkClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn driver_error(context: &str, err: DriverError) -> CliError {
    match err {
        DriverError::Frame(err) => frame_error(context, err),
        DriverError::Sink(source) => io_error(context, source),
    }
}

#[cfg(test)]
mod tests {
    #[cfg(unix)]
    use std::path::PathBuf;

    use super::*;

    #[cfg(unix)]
    #[test]
    fn permission_denied_maps_to_dedicated_code() {
        let err = transport_error(
            "open failed",
            TransportError::Open {
                path: PathBuf::from("/dev/ttyUSB0"),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            },
        );
        assert_eq!(err.code, PERMISSION_DENIED);
        assert!(err.message.starts_with("open failed: "));
    }

    #[cfg(unix)]
    #[test]
    fn transport_failures_map_to_transport_code() {
        let err = transport_error(
            "open failed",
            TransportError::RetriesExhausted {
                path: PathBuf::from("/dev/ttyUSB0"),
                attempts: 3,
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
        assert_eq!(
            transport_error("x", TransportError::UnsupportedBaud(7)).code,
            USAGE
        );
    }

    #[test]
    fn layout_errors_are_data_invalid() {
        let err = driver_error(
            "read failed",
            DriverError::Frame(FrameError::Schema(SchemaError::LayoutMismatch {
                expected: 44,
                actual: 40,
            })),
        );
        assert_eq!(err.code, DATA_INVALID);
        assert_eq!(
            schema_error("x", SchemaError::LoadFailed("gone".into())).code,
            FAILURE
        );
    }
}
