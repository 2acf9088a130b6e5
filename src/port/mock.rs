//! Mock serial backend for testing.
//!
//! `MockBackend` simulates a set of serial devices without hardware. Each
//! device can loop written bytes back to its own receive buffer, accept bytes
//! injected as if sent by the remote end, and be "unplugged" to exercise the
//! removal paths of the connection.

use super::error::PortError;
use super::traits::{PortSettings, SerialBackend, SerialTransport};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::sync::Arc;

/// Simulated state of one device, shared by every handle opened on it.
#[derive(Debug)]
struct MockDevice {
    /// Bytes waiting to be read.
    read_queue: VecDeque<u8>,
    /// Log of every write, in order.
    write_log: Vec<Vec<u8>>,
    /// Echo writes back into `read_queue`.
    loopback: bool,
    /// The device has been unplugged.
    removed: bool,
    /// A handle currently holds the device.
    in_use: bool,
    /// Number of successful opens.
    open_count: usize,
    /// Baud rate of the most recent open or change.
    baud_rate: u32,
    /// Fail the next write with an I/O error.
    fail_next_write: bool,
    /// Fail the next `bytes_to_read` with a timeout.
    fail_next_read: bool,
    /// Fail the next close of the primary handle with a driver error.
    fail_next_close: bool,
}

impl MockDevice {
    fn new(loopback: bool) -> Self {
        Self {
            read_queue: VecDeque::new(),
            write_log: Vec::new(),
            loopback,
            removed: false,
            in_use: false,
            open_count: 0,
            baud_rate: 0,
            fail_next_write: false,
            fail_next_read: false,
            fail_next_close: false,
        }
    }
}

type SharedDevice = Arc<Mutex<MockDevice>>;

fn removed_error() -> PortError {
    PortError::Io(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "device has been removed",
    ))
}

/// Mock serial backend.
///
/// # Example
/// ```
/// use serial_connection::port::{MockBackend, PortSettings, SerialBackend, SerialTransport};
///
/// let backend = MockBackend::new().with_loopback_port("COM3");
/// let mut port = backend.open(&PortSettings::new("COM3", 9600)).unwrap();
///
/// port.write_all(&[1, 2, 3]).unwrap();
/// assert_eq!(port.bytes_to_read().unwrap(), 3);
///
/// let mut buffer = [0u8; 3];
/// assert_eq!(port.read_bytes(&mut buffer).unwrap(), 3);
/// assert_eq!(buffer, [1, 2, 3]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    devices: Arc<Mutex<BTreeMap<String, SharedDevice>>>,
}

impl MockBackend {
    /// Create a backend with no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device whose writes are echoed back to its receive buffer.
    pub fn with_loopback_port(self, name: impl Into<String>) -> Self {
        self.add_port(name, true);
        self
    }

    /// Add a device that only receives what is injected.
    pub fn with_port(self, name: impl Into<String>) -> Self {
        self.add_port(name, false);
        self
    }

    /// Plug a device in.
    pub fn add_port(&self, name: impl Into<String>, loopback: bool) {
        self.devices
            .lock()
            .insert(name.into(), Arc::new(Mutex::new(MockDevice::new(loopback))));
    }

    /// Unplug a device. Handles already open on it start failing with an
    /// I/O error and it disappears from enumeration.
    pub fn remove_port(&self, name: &str) {
        if let Some(device) = self.devices.lock().remove(name) {
            device.lock().removed = true;
        }
    }

    /// Queue bytes as if the remote end had sent them.
    pub fn inject(&self, name: &str, data: &[u8]) {
        if let Some(device) = self.device(name) {
            device.lock().read_queue.extend(data);
        }
    }

    /// Every write made to the device, in order.
    pub fn write_log(&self, name: &str) -> Vec<Vec<u8>> {
        self.device(name)
            .map(|device| device.lock().write_log.clone())
            .unwrap_or_default()
    }

    /// Number of successful opens of the device.
    pub fn open_count(&self, name: &str) -> usize {
        self.device(name)
            .map(|device| device.lock().open_count)
            .unwrap_or(0)
    }

    /// Whether a handle currently holds the device.
    pub fn is_in_use(&self, name: &str) -> bool {
        self.device(name)
            .map(|device| device.lock().in_use)
            .unwrap_or(false)
    }

    /// Baud rate the device was last opened or reconfigured with.
    pub fn baud_rate(&self, name: &str) -> Option<u32> {
        self.device(name).map(|device| device.lock().baud_rate)
    }

    /// Make the next write to the device fail.
    pub fn fail_next_write(&self, name: &str) {
        if let Some(device) = self.device(name) {
            device.lock().fail_next_write = true;
        }
    }

    /// Make the next buffered-byte query on the device time out. The device
    /// stays usable afterwards.
    pub fn fail_next_read(&self, name: &str) {
        if let Some(device) = self.device(name) {
            device.lock().fail_next_read = true;
        }
    }

    /// Make the next close of the device fail with a non-I/O driver error.
    /// The device is still released.
    pub fn fail_next_close(&self, name: &str) {
        if let Some(device) = self.device(name) {
            device.lock().fail_next_close = true;
        }
    }

    fn device(&self, name: &str) -> Option<SharedDevice> {
        self.devices.lock().get(name).cloned()
    }
}

impl SerialBackend for MockBackend {
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn SerialTransport>, PortError> {
        let device = self
            .device(&settings.port_name)
            .ok_or_else(|| PortError::not_found(settings.port_name.as_str()))?;

        {
            let mut state = device.lock();
            if state.in_use {
                return Err(PortError::busy(settings.port_name.as_str()));
            }
            state.in_use = true;
            state.open_count += 1;
            state.baud_rate = settings.baud_rate;
        }

        Ok(Box::new(MockTransport {
            name: settings.port_name.clone(),
            device,
            primary: true,
        }))
    }

    fn available_ports(&self) -> Result<Vec<String>, PortError> {
        Ok(self.devices.lock().keys().cloned().collect())
    }
}

/// A handle on a simulated device.
#[derive(Debug)]
pub struct MockTransport {
    name: String,
    device: SharedDevice,
    /// The handle returned by `open`; clones do not own the device.
    primary: bool,
}

impl SerialTransport for MockTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_to_read(&self) -> Result<usize, PortError> {
        let mut state = self.device.lock();
        if state.removed {
            return Err(removed_error());
        }
        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(PortError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "simulated read timeout",
            )));
        }
        Ok(state.read_queue.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.device.lock();
        if state.removed {
            return Err(removed_error());
        }

        let n = buffer.len().min(state.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), PortError> {
        let mut state = self.device.lock();
        if state.removed {
            return Err(removed_error());
        }
        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(PortError::Io(io::Error::new(
                io::ErrorKind::Other,
                "simulated write failure",
            )));
        }

        state.write_log.push(data.to_vec());
        if state.loopback {
            state.read_queue.extend(data);
        }
        Ok(())
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), PortError> {
        let mut state = self.device.lock();
        if state.removed {
            return Err(removed_error());
        }
        state.baud_rate = baud_rate;
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn SerialTransport>, PortError> {
        if self.device.lock().removed {
            return Err(removed_error());
        }
        Ok(Box::new(Self {
            name: self.name.clone(),
            device: Arc::clone(&self.device),
            primary: false,
        }))
    }

    fn close(self: Box<Self>) -> Result<(), PortError> {
        let mut state = self.device.lock();
        if !self.primary {
            return if state.removed { Err(removed_error()) } else { Ok(()) };
        }

        state.in_use = false;
        if state.removed {
            return Err(removed_error());
        }
        if state.fail_next_close {
            state.fail_next_close = false;
            return Err(PortError::Serial(serialport::Error::new(
                serialport::ErrorKind::Unknown,
                "simulated close failure",
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(backend: &MockBackend, name: &str) -> Box<dyn SerialTransport> {
        backend.open(&PortSettings::new(name, 9600)).unwrap()
    }

    #[test]
    fn test_open_unknown_port() {
        let backend = MockBackend::new();
        let result = backend.open(&PortSettings::new("COM999", 9600));
        assert!(matches!(result, Err(PortError::NotFound(name)) if name == "COM999"));
    }

    #[test]
    fn test_open_busy_port() {
        let backend = MockBackend::new().with_port("COM1");
        let _held = open(&backend, "COM1");
        let result = backend.open(&PortSettings::new("COM1", 9600));
        assert!(matches!(result, Err(PortError::Busy(_))));
    }

    #[test]
    fn test_close_releases_port() {
        let backend = MockBackend::new().with_port("COM1");
        let port = open(&backend, "COM1");
        assert!(backend.is_in_use("COM1"));

        port.close().unwrap();
        assert!(!backend.is_in_use("COM1"));
        assert_eq!(backend.open_count("COM1"), 1);
    }

    #[test]
    fn test_inject_and_partial_read() {
        let backend = MockBackend::new().with_port("COM1");
        let mut port = open(&backend, "COM1");
        backend.inject("COM1", b"Hello, World!");

        let mut buffer = [0u8; 5];
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"Hello");
        assert_eq!(port.bytes_to_read().unwrap(), 8);
    }

    #[test]
    fn test_loopback_through_clone() {
        let backend = MockBackend::new().with_loopback_port("COM3");
        let mut writer = open(&backend, "COM3");
        let mut reader = writer.try_clone().unwrap();

        writer.write_all(b"ping").unwrap();
        let mut buffer = [0u8; 8];
        let n = reader.read_bytes(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"ping");
        assert_eq!(backend.write_log("COM3"), vec![b"ping".to_vec()]);

        // Dropping a clone does not release the device.
        reader.close().unwrap();
        assert!(backend.is_in_use("COM3"));
    }

    #[test]
    fn test_removed_device_fails_io() {
        let backend = MockBackend::new().with_port("COM4");
        let mut port = open(&backend, "COM4");
        backend.remove_port("COM4");

        assert!(port.bytes_to_read().unwrap_err().is_device_removed());
        assert!(port.write_all(b"x").unwrap_err().is_io());
        assert!(port.close().unwrap_err().is_io());
        assert!(backend.available_ports().unwrap().is_empty());
    }

    #[test]
    fn test_fail_next_read_is_transient() {
        let backend = MockBackend::new().with_port("COM1");
        let port = open(&backend, "COM1");
        backend.fail_next_read("COM1");

        let err = port.bytes_to_read().unwrap_err();
        assert!(err.is_io() && !err.is_device_removed());
        assert_eq!(port.bytes_to_read().unwrap(), 0);
    }

    #[test]
    fn test_fail_next_close_still_releases() {
        let backend = MockBackend::new().with_port("COM1");
        let port = open(&backend, "COM1");
        let clone = port.try_clone().unwrap();
        backend.fail_next_close("COM1");

        // Clones do not consume the failure.
        clone.close().unwrap();
        let err = port.close().unwrap_err();
        assert!(!err.is_io());
        assert!(!backend.is_in_use("COM1"));
    }

    #[test]
    fn test_fail_next_write() {
        let backend = MockBackend::new().with_port("COM1");
        let mut port = open(&backend, "COM1");
        backend.fail_next_write("COM1");

        assert!(port.write_all(b"a").is_err());
        assert!(port.write_all(b"b").is_ok());
        assert_eq!(backend.write_log("COM1"), vec![b"b".to_vec()]);
    }
}
