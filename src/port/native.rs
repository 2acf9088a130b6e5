//! Native serial port backend.
//!
//! Wraps the `serialport` crate's `SerialPort` trait behind our own
//! `SerialTransport` and `SerialBackend` traits.

use super::error::PortError;
use super::traits::{PortSettings, SerialBackend, SerialTransport};
use std::io::{Read, Write};

/// Backend that opens real OS serial devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        Self
    }
}

impl SerialBackend for NativeBackend {
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn SerialTransport>, PortError> {
        NativeTransport::open(settings).map(|port| Box::new(port) as Box<dyn SerialTransport>)
    }

    fn available_ports(&self) -> Result<Vec<String>, PortError> {
        let ports = serialport::available_ports().map_err(PortError::Serial)?;
        Ok(ports.into_iter().map(|info| info.port_name).collect())
    }
}

/// An open OS serial handle.
pub struct NativeTransport {
    port: Box<dyn serialport::SerialPort>,
    name: String,
}

impl NativeTransport {
    /// Open a serial port with the fixed 8N1 framing.
    ///
    /// # Example
    /// ```no_run
    /// use serial_connection::port::{NativeTransport, PortSettings};
    ///
    /// let port = NativeTransport::open(&PortSettings::new("/dev/ttyUSB0", 115200))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(settings: &PortSettings) -> Result<Self, PortError> {
        let port = serialport::new(settings.port_name.as_str(), settings.baud_rate)
            .data_bits(PortSettings::DATA_BITS)
            .parity(PortSettings::PARITY)
            .stop_bits(PortSettings::STOP_BITS)
            .flow_control(PortSettings::FLOW_CONTROL)
            .timeout(settings.timeout)
            .open()
            .map_err(|e| PortError::from_serial(&settings.port_name, e))?;

        Ok(Self {
            port,
            name: settings.port_name.clone(),
        })
    }

    /// Get a reference to the underlying serialport implementation.
    pub fn as_raw(&self) -> &dyn serialport::SerialPort {
        &*self.port
    }
}

impl SerialTransport for NativeTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_to_read(&self) -> Result<usize, PortError> {
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(|e| PortError::from_serial(&self.name, e))
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.port.read(buffer).map_err(PortError::Io)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), PortError> {
        self.port.write_all(data).map_err(PortError::Io)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), PortError> {
        self.port
            .set_baud_rate(baud_rate)
            .map_err(|e| PortError::from_serial(&self.name, e))
    }

    fn try_clone(&self) -> Result<Box<dyn SerialTransport>, PortError> {
        let port = self
            .port
            .try_clone()
            .map_err(|e| PortError::from_serial(&self.name, e))?;

        Ok(Box::new(Self {
            port,
            name: self.name.clone(),
        }))
    }

    fn close(mut self: Box<Self>) -> Result<(), PortError> {
        // Draining pending output is where a vanished device reports itself;
        // the descriptor is released when `self` drops either way.
        self.port.flush().map_err(PortError::Io)
    }
}

impl std::fmt::Debug for NativeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeTransport")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate().ok())
            .finish()
    }
}
