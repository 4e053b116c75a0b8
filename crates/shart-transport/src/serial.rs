use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};

/// Baud rates accepted by [`SerialPort::open`].
pub const SUPPORTED_BAUD_RATES: [u32; 6] = [9600, 19200, 38400, 57600, 115200, 230400];

/// Settings for opening a serial device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Line speed. Default: 230400.
    pub baud_rate: u32,
    /// Delay between open attempts in [`SerialPort::open_with_retry`].
    pub retry_interval: Duration,
    /// Give up after this many attempts. `None` retries until cancelled.
    pub max_attempts: Option<u32>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 230_400,
            retry_interval: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

/// A tty in raw 8N1 mode with non-blocking reads.
///
/// Reads return `WouldBlock` when nothing is pending.
#[derive(Debug)]
pub struct SerialPort {
    file: File,
    path: PathBuf,
    baud_rate: u32,
}

impl SerialPort {
    /// Open and configure a serial device.
    pub fn open(path: impl AsRef<Path>, config: &SerialConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed = speed_for(config.baud_rate)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;

        configure_raw(&file, speed).map_err(|e| TransportError::Configure {
            path: path.clone(),
            source: e,
        })?;

        info!(?path, baud = config.baud_rate, "serial port open");

        Ok(Self {
            file,
            path,
            baud_rate: config.baud_rate,
        })
    }

    /// Open a device, waiting for it to appear.
    ///
    /// Missing, busy, or not-yet-permitted devices are retried every
    /// `retry_interval` while `keep_going` returns true and the attempt limit
    /// is not reached. Any other failure is returned immediately.
    pub fn open_with_retry(
        path: impl AsRef<Path>,
        config: &SerialConfig,
        keep_going: impl Fn() -> bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut attempts = 0u32;

        loop {
            if !keep_going() {
                return Err(TransportError::Cancelled {
                    path: path.to_path_buf(),
                });
            }
            attempts += 1;

            let source = match Self::open(path, config) {
                Ok(port) => return Ok(port),
                Err(TransportError::Open { source, .. }) if is_retryable(&source) => source,
                Err(err) => return Err(err),
            };

            if config.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(TransportError::RetriesExhausted {
                    path: path.to_path_buf(),
                    attempts,
                    source,
                });
            }

            warn!(
                ?path,
                attempt = attempts,
                error = %source,
                "serial port unavailable, retrying"
            );
            std::thread::sleep(config.retry_interval);
        }
    }

    /// Device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured line speed.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Discard bytes received but not yet read.
    pub fn discard_input(&self) -> Result<()> {
        // SAFETY: the descriptor is owned by `self.file` and open.
        let rc = unsafe { libc::tcflush(self.file.as_raw_fd(), libc::TCIFLUSH) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        debug!(path = ?self.path, "discarded pending input");
        Ok(())
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        // SAFETY: the descriptor is owned by `self.file` and open.
        let rc = unsafe { libc::tcdrain(self.file.as_raw_fd()) };
        if rc == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        // Pseudo-terminals and some adapters do not support draining.
        if err.raw_os_error() == Some(libc::ENOTTY) {
            Ok(())
        } else {
            Err(err)
        }
    }
}

fn is_retryable(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::NotFound | ErrorKind::PermissionDenied
    ) || err.raw_os_error() == Some(libc::EBUSY)
}

fn speed_for(baud_rate: u32) -> Result<libc::speed_t> {
    let speed = match baud_rate {
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        other => return Err(TransportError::UnsupportedBaud(other)),
    };
    Ok(speed)
}

fn configure_raw(file: &File, speed: libc::speed_t) -> std::io::Result<()> {
    let fd = file.as_raw_fd();

    // SAFETY: termios is a plain C struct; all-zero is a valid value that
    // tcgetattr overwrites.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is open for the lifetime of `file` and `tio` is a valid
    // writable termios.
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `tio` is a valid termios obtained above.
    unsafe { libc::cfmakeraw(&mut tio) };

    // 8 data bits, no parity, one stop bit, receiver on, ignore modem lines.
    tio.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::CSTOPB);
    tio.c_cflag |= libc::CS8 | libc::CREAD | libc::CLOCAL;
    tio.c_cc[libc::VMIN] = 0;
    tio.c_cc[libc::VTIME] = 0;

    // SAFETY: `tio` is valid and `speed` is one of the libc speed constants.
    let rc = unsafe {
        let rc = libc::cfsetispeed(&mut tio, speed);
        if rc == 0 {
            libc::cfsetospeed(&mut tio, speed)
        } else {
            rc
        }
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `fd` is open and `tio` is fully initialized.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "shart-transport-{name}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fast_retry(max_attempts: Option<u32>) -> SerialConfig {
        SerialConfig {
            retry_interval: Duration::from_millis(1),
            max_attempts,
            ..SerialConfig::default()
        }
    }

    #[test]
    fn default_config() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 230_400);
        assert_eq!(config.retry_interval, Duration::from_secs(1));
        assert_eq!(config.max_attempts, None);
    }

    #[test]
    fn supported_baud_rates_map_to_speeds() {
        for baud in SUPPORTED_BAUD_RATES {
            assert!(speed_for(baud).is_ok(), "{baud} should be supported");
        }
        assert!(matches!(
            speed_for(12_345),
            Err(TransportError::UnsupportedBaud(12_345))
        ));
    }

    #[test]
    fn unsupported_baud_rejected_before_open() {
        let config = SerialConfig {
            baud_rate: 1_000_000,
            ..SerialConfig::default()
        };
        let err = SerialPort::open("/nonexistent/tty", &config).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedBaud(1_000_000)));
    }

    #[test]
    fn missing_device_exhausts_retries() {
        let dir = temp_dir("missing");
        let path = dir.join("ttyUSB-none");

        let err = SerialPort::open_with_retry(&path, &fast_retry(Some(3)), || true).unwrap_err();
        match err {
            TransportError::RetriesExhausted {
                attempts, source, ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(source.kind(), ErrorKind::NotFound);
            }
            other => panic!("expected retries exhausted, got {other:?}"),
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn retry_stops_when_cancelled() {
        let dir = temp_dir("cancel");
        let path = dir.join("ttyACM-none");
        let calls = Cell::new(0u32);

        let err = SerialPort::open_with_retry(&path, &fast_retry(None), || {
            calls.set(calls.get() + 1);
            calls.get() <= 2
        })
        .unwrap_err();

        assert!(matches!(err, TransportError::Cancelled { .. }));
        assert_eq!(calls.get(), 3);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn non_tty_fails_configuration_without_retry() {
        let dir = temp_dir("regular");
        let path = dir.join("capture.bin");
        std::fs::write(&path, b"not a tty").unwrap();
        let calls = Cell::new(0u32);

        let err = SerialPort::open_with_retry(&path, &fast_retry(None), || {
            calls.set(calls.get() + 1);
            true
        })
        .unwrap_err();

        assert!(matches!(err, TransportError::Configure { .. }));
        assert_eq!(calls.get(), 1);
        assert!(err.io_error().is_some());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn pseudo_terminal_round_trip() {
        use std::ffi::CStr;
        use std::os::fd::FromRawFd;

        // SAFETY: plain libc calls on a descriptor this test owns.
        let master_fd = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
        if master_fd < 0 {
            // No pty support in this environment.
            return;
        }
        // SAFETY: `master_fd` was just returned by posix_openpt and is owned here.
        let mut master = unsafe { File::from_raw_fd(master_fd) };

        let mut name = [0 as libc::c_char; 128];
        // SAFETY: `master_fd` is a valid pty master and `name` is writable for its length.
        let ok = unsafe {
            libc::grantpt(master_fd) == 0
                && libc::unlockpt(master_fd) == 0
                && libc::ptsname_r(master_fd, name.as_mut_ptr(), name.len()) == 0
        };
        assert!(ok, "pty setup failed");
        // SAFETY: ptsname_r wrote a NUL-terminated string into `name`.
        let slave = unsafe { CStr::from_ptr(name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        let mut port = SerialPort::open(&slave, &SerialConfig::default()).unwrap();
        assert_eq!(port.baud_rate(), 230_400);
        assert_eq!(port.path(), Path::new(&slave));

        let mut buf = [0u8; 8];
        let err = port.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);

        master.write_all(&[0xAA, 0x0D, 0x0A, 0x00]).unwrap();
        let mut received = Vec::new();
        for _ in 0..200 {
            match port.read(&mut buf) {
                Ok(n) => received.extend_from_slice(&buf[..n]),
                Err(err) if err.kind() == ErrorKind::WouldBlock => {}
                Err(err) => panic!("read failed: {err}"),
            }
            if received.len() >= 4 {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        // Raw mode: no CR/LF translation.
        assert_eq!(received, vec![0xAA, 0x0D, 0x0A, 0x00]);

        port.write_all(&[0xA5, 0x01]).unwrap();
        port.flush().unwrap();
        let mut echoed = [0u8; 2];
        master.read_exact(&mut echoed).unwrap();
        assert_eq!(echoed, [0xA5, 0x01]);
    }
}
