//! [`Connection`] over a serial port.

use super::events::{
    DataHandler, DataReceived, ErrorHandler, InboundChunk, SubscriptionId, Subscribers,
};
use super::traits::Connection;
use crate::error::{ConnectionError, ConnectionErrorKind, ConnectionResult};
use crate::port::{
    Arrival, ArrivalHandler, NativeBackend, PortError, PortSettings, SafeSerialHandle,
    SerialBackend, DEFAULT_BAUD_RATE,
};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Subscribers shared between the connection and its arrival monitor.
struct EventHub {
    data: Subscribers<dyn Fn(&DataReceived) + Send + Sync>,
    errors: Subscribers<dyn Fn(&ConnectionError) + Send + Sync>,
}

impl EventHub {
    fn new() -> Self {
        Self {
            data: Subscribers::new(),
            errors: Subscribers::new(),
        }
    }

    fn deliver(&self, source: String, bytes: Vec<u8>) {
        let event = DataReceived {
            source,
            data: InboundChunk::from(bytes),
        };
        for handler in self.data.snapshot() {
            handler(&event);
        }
    }

    fn raise(&self, source: &str, err: ConnectionError) {
        let removed = err.port_error().is_some_and(PortError::is_device_removed);
        let cause = err.port_error().map(ToString::to_string).unwrap_or_default();
        if removed {
            error!(connection = source, %cause, "serial device removed while receiving");
        } else {
            error!(connection = source, %cause, "{err}");
        }

        for handler in self.errors.snapshot() {
            handler(&err);
        }
    }

    fn clear(&self) {
        self.data.clear();
        self.errors.clear();
    }
}

/// A connection to one serial port.
///
/// Framing is fixed at 8N1 without flow control. Arriving bytes are read on
/// a background thread and delivered to subscribers in the order they were
/// read, one [`InboundChunk`] per notification.
///
/// # Example
/// ```
/// use serial_connection::{Connection, MockBackend, PortSettings, SerialConnection};
/// use std::sync::Arc;
///
/// let backend = MockBackend::new().with_loopback_port("COM3");
/// let conn = SerialConnection::with_backend(PortSettings::new("COM3", 9600), Arc::new(backend));
///
/// conn.connect()?;
/// conn.send(&[0x01, 0x02, 0x03])?;
/// assert_eq!(conn.to_string(), "COM3@9600");
/// conn.dispose();
/// # Ok::<(), serial_connection::ConnectionError>(())
/// ```
pub struct SerialConnection {
    settings: Arc<RwLock<PortSettings>>,
    handle: SafeSerialHandle,
    events: Arc<EventHub>,
    disposed: AtomicBool,
}

impl SerialConnection {
    /// Connection to a real serial device.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self::with_backend(
            PortSettings::new(port_name, baud_rate),
            Arc::new(NativeBackend::new()),
        )
    }

    /// Connection to a real serial device at 9600 baud.
    pub fn with_default_baud(port_name: impl Into<String>) -> Self {
        Self::new(port_name, DEFAULT_BAUD_RATE)
    }

    /// Connection that opens its port through `backend`.
    pub fn with_backend(settings: PortSettings, backend: Arc<dyn SerialBackend>) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
            handle: SafeSerialHandle::new(backend),
            events: Arc::new(EventHub::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Names of the serial devices present on this machine.
    pub fn available_ports() -> Result<Vec<String>, PortError> {
        NativeBackend::new().available_ports()
    }

    /// Names of the devices visible to this connection's backend.
    pub fn port_names(&self) -> Result<Vec<String>, PortError> {
        self.handle.backend().available_ports()
    }

    pub fn port_name(&self) -> String {
        self.settings.read().port_name.clone()
    }

    /// Change the device name. Only allowed while disconnected.
    pub fn set_port_name(&self, port_name: impl Into<String>) -> ConnectionResult<()> {
        self.ensure_not_disposed()?;
        if self.handle.is_open() {
            return Err(ConnectionError::new(
                ConnectionErrorKind::Config,
                "Cannot change the port name while the port is open.",
            ));
        }
        self.settings.write().port_name = port_name.into();
        Ok(())
    }

    pub fn baud_rate(&self) -> u32 {
        self.settings.read().baud_rate
    }

    /// Change the baud rate; applied to the open port immediately.
    pub fn set_baud_rate(&self, baud_rate: u32) -> ConnectionResult<()> {
        self.ensure_not_disposed()?;
        if baud_rate == 0 {
            return Err(ConnectionError::with_source(
                ConnectionErrorKind::Config,
                "Invalid baud rate.",
                PortError::config("baud rate must be positive"),
            ));
        }

        match self.handle.set_baud_rate(baud_rate) {
            Ok(()) | Err(PortError::NotOpen) => {}
            Err(e) => {
                return Err(ConnectionError::with_source(
                    ConnectionErrorKind::Config,
                    "Failed to change baud rate.",
                    e,
                ))
            }
        }

        self.settings.write().baud_rate = baud_rate;
        Ok(())
    }

    /// A copy of the current settings.
    pub fn settings(&self) -> PortSettings {
        self.settings.read().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_not_disposed(&self) -> ConnectionResult<()> {
        if self.is_disposed() {
            return Err(ConnectionError::disposed());
        }
        Ok(())
    }

    fn note_late_subscription(&self, what: &str) {
        if self.is_disposed() {
            debug!(connection = %self, "{what} handler added after dispose will never be called");
        }
    }

    fn arrival_handler(&self) -> ArrivalHandler {
        let settings = Arc::clone(&self.settings);
        let events = Arc::clone(&self.events);

        Arc::new(move |arrival: Arrival| {
            let source = settings.read().to_string();
            match arrival {
                Arrival::Data(bytes) => events.deliver(source, bytes),
                Arrival::Failed(e) => events.raise(&source, ConnectionError::receive(e)),
            }
        })
    }

    /// Close the handle, absorbing the I/O failure a removed virtual port
    /// produces on close.
    fn close_handle(&self) -> ConnectionResult<()> {
        match self.handle.close() {
            Ok(()) => Ok(()),
            Err(e) if e.is_io() => {
                warn!(connection = %self, error = %e, "port vanished before close");
                Ok(())
            }
            Err(e) => Err(ConnectionError::close(e)),
        }
    }
}

impl Connection for SerialConnection {
    fn connect(&self) -> ConnectionResult<()> {
        self.ensure_not_disposed()?;
        let settings = self.settings();

        self.handle
            .open(&settings, self.arrival_handler())
            .map_err(|e| {
                debug!(connection = %settings, error = %e, "open failed");
                ConnectionError::open(e)
            })
    }

    fn disconnect(&self) -> ConnectionResult<()> {
        self.ensure_not_disposed()?;
        self.close_handle()
    }

    fn send(&self, data: &[u8]) -> ConnectionResult<()> {
        self.ensure_not_disposed()?;
        self.handle.write_all(data).map_err(ConnectionError::send)
    }

    fn is_connected(&self) -> bool {
        self.handle.is_open()
    }

    fn subscribe(&self, handler: DataHandler) -> SubscriptionId {
        self.note_late_subscription("data");
        self.events.data.subscribe(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.data.unsubscribe(id)
    }

    fn subscribe_errors(&self, handler: ErrorHandler) -> SubscriptionId {
        self.note_late_subscription("error");
        self.events.errors.subscribe(handler)
    }

    fn unsubscribe_errors(&self, id: SubscriptionId) -> bool {
        self.events.errors.unsubscribe(id)
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Err(e) = self.close_handle() {
            debug!(connection = %self, error = %e, "ignored close failure while disposing");
        }
        self.handle.dispose();
        self.events.clear();
        debug!(connection = %self, "connection disposed");
    }
}

impl Drop for SerialConnection {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Display for SerialConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.settings.read(), f)
    }
}

impl fmt::Debug for SerialConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialConnection")
            .field("settings", &*self.settings.read())
            .field("connected", &self.is_connected())
            .field("disposed", &self.is_disposed())
            .field("subscribers", &self.events.data.len())
            .finish()
    }
}
