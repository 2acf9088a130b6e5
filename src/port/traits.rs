//! Core traits for serial port abstraction.
//!
//! `SerialBackend` opens ports and enumerates them, `SerialTransport` is one
//! open handle. Real hardware and the mock backend are interchangeable behind
//! these traits.

use super::error::PortError;
use std::fmt;
use std::time::Duration;

/// Default baud rate when none is given.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default read timeout of an open handle.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default interval at which the arrival monitor polls for buffered bytes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Settings used to open a serial port.
///
/// Framing is fixed at 8 data bits, no parity, one stop bit and no flow
/// control; see the associated constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSettings {
    /// OS device name, e.g. `COM3` or `/dev/ttyUSB0`.
    pub port_name: String,

    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Read/write timeout of the native handle.
    pub timeout: Duration,

    /// How often the arrival monitor checks for buffered bytes.
    pub poll_interval: Duration,
}

impl PortSettings {
    pub const DATA_BITS: serialport::DataBits = serialport::DataBits::Eight;
    pub const PARITY: serialport::Parity = serialport::Parity::None;
    pub const STOP_BITS: serialport::StopBits = serialport::StopBits::One;
    pub const FLOW_CONTROL: serialport::FlowControl = serialport::FlowControl::None;

    /// Settings for `port_name` at `baud_rate` with default timings.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Reject settings no backend could open.
    pub fn validate(&self) -> Result<(), PortError> {
        if self.port_name.trim().is_empty() {
            return Err(PortError::config("port name must not be empty"));
        }
        if self.baud_rate == 0 {
            return Err(PortError::config("baud rate must be positive"));
        }
        if self.poll_interval.is_zero() {
            return Err(PortError::config("poll interval must be positive"));
        }
        Ok(())
    }
}

impl Default for PortSettings {
    fn default() -> Self {
        Self::new(String::new(), DEFAULT_BAUD_RATE)
    }
}

impl fmt::Display for PortSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.port_name, self.baud_rate)
    }
}

/// One open serial handle.
///
/// The read side and the write side of a port may live on different
/// threads; [`try_clone`](SerialTransport::try_clone) hands out an
/// independent handle to the same device for that purpose.
pub trait SerialTransport: Send + fmt::Debug {
    /// Name/path of the device this handle refers to.
    fn name(&self) -> &str;

    /// Number of bytes buffered by the driver and ready to read.
    fn bytes_to_read(&self) -> Result<usize, PortError>;

    /// Read bytes into `buffer`, returning how many were read.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Write all of `data`.
    fn write_all(&mut self, data: &[u8]) -> Result<(), PortError>;

    /// Change the baud rate of the open handle.
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), PortError>;

    /// Open a second handle to the same device.
    fn try_clone(&self) -> Result<Box<dyn SerialTransport>, PortError>;

    /// Release the handle, reporting any failure of the native close.
    fn close(self: Box<Self>) -> Result<(), PortError>;
}

/// Opens serial handles and lists available devices.
pub trait SerialBackend: Send + Sync + fmt::Debug {
    /// Open the device described by `settings` with the fixed 8N1 framing.
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn SerialTransport>, PortError>;

    /// Names of the serial devices currently present.
    fn available_ports(&self) -> Result<Vec<String>, PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = PortSettings::default();
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.timeout, Duration::from_secs(1));
        assert_eq!(settings.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_fixed_framing() {
        assert_eq!(PortSettings::DATA_BITS, serialport::DataBits::Eight);
        assert_eq!(PortSettings::PARITY, serialport::Parity::None);
        assert_eq!(PortSettings::STOP_BITS, serialport::StopBits::One);
        assert_eq!(PortSettings::FLOW_CONTROL, serialport::FlowControl::None);
    }

    #[test]
    fn test_validate() {
        assert!(PortSettings::new("COM3", 9600).validate().is_ok());
        assert!(matches!(
            PortSettings::new("COM3", 0).validate(),
            Err(PortError::Config(_))
        ));
        assert!(PortSettings::new("", 9600).validate().is_err());
        assert!(PortSettings::new("COM3", 9600)
            .with_poll_interval(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(PortSettings::new("COM5", 115200).to_string(), "COM5@115200");
    }
}
