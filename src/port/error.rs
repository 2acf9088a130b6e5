//! Port-specific error types.
//!
//! These are the low-level failures of a serial handle. The connection layer
//! wraps them in [`ConnectionError`](crate::error::ConnectionError) before
//! they reach a caller.

use std::io;
use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Attempted to use a port that's not open.
    #[error("Port is not open")]
    NotOpen,

    /// The port is held by another handle.
    #[error("Serial port is busy: {0}")]
    Busy(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Busy error from a port name.
    pub fn busy(port_name: impl Into<String>) -> Self {
        Self::Busy(port_name.into())
    }

    /// Map an error from the `serialport` crate, keeping I/O failures as `Io`
    /// so the close path can recognize them.
    pub fn from_serial(port_name: &str, err: serialport::Error) -> Self {
        match err.kind() {
            serialport::ErrorKind::NoDevice => Self::not_found(port_name),
            serialport::ErrorKind::InvalidInput => Self::config(err.to_string()),
            serialport::ErrorKind::Io(kind) => Self::Io(io::Error::new(kind, err.description)),
            serialport::ErrorKind::Unknown => Self::Serial(err),
        }
    }

    /// Whether this is a plain I/O failure of an already opened handle.
    ///
    /// Closing a handle whose USB/virtual device has vanished fails this way.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Whether the OS reports that the device behind the handle is gone.
    pub fn is_device_removed(&self) -> bool {
        match self {
            Self::Io(e) => {
                matches!(
                    e.kind(),
                    io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected
                ) || e.raw_os_error().is_some_and(is_removed_os_code)
            }
            _ => false,
        }
    }
}

#[cfg(unix)]
fn is_removed_os_code(code: i32) -> bool {
    matches!(code, libc::ENXIO | libc::ENODEV | libc::EIO)
}

#[cfg(windows)]
fn is_removed_os_code(code: i32) -> bool {
    use winapi::shared::winerror::{
        ERROR_ACCESS_DENIED, ERROR_BAD_COMMAND, ERROR_DEVICE_NOT_CONNECTED, ERROR_GEN_FAILURE,
        ERROR_OPERATION_ABORTED,
    };

    matches!(
        code as u32,
        ERROR_ACCESS_DENIED
            | ERROR_BAD_COMMAND
            | ERROR_DEVICE_NOT_CONNECTED
            | ERROR_GEN_FAILURE
            | ERROR_OPERATION_ABORTED
    )
}

#[cfg(not(any(unix, windows)))]
fn is_removed_os_code(_code: i32) -> bool {
    false
}
