//! Serial transport for shart telemetry links.
//!
//! Opens a tty in raw 8N1 mode, non-blocking, so the frame layer can poll it
//! for readiness. Devices that come and go (USB adapters) are handled by
//! [`SerialPort::open_with_retry`].

pub mod error;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};

#[cfg(unix)]
pub use serial::{SerialConfig, SerialPort, SUPPORTED_BAUD_RATES};
