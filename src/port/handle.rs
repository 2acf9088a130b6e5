//! Crash-safe ownership of an open serial handle.
//!
//! USB and virtual COM ports can vanish while a handle still refers to them.
//! `SafeSerialHandle` makes opening and closing idempotent, keeps the
//! explicit [`close`](SafeSerialHandle::close) as the only path that reports
//! failures, and makes the drop path swallow everything a dead device can
//! throw at it.

use super::error::PortError;
use super::monitor::{ArrivalHandler, ArrivalMonitor};
use super::traits::{PortSettings, SerialBackend, SerialTransport};
use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Everything that exists only while the handle is open.
struct OpenPort {
    writer: Box<dyn SerialTransport>,
    monitor: ArrivalMonitor,
}

/// Owner of one serial handle and its arrival monitor.
pub struct SafeSerialHandle {
    backend: Arc<dyn SerialBackend>,
    /// Serializes open/close. Never held while joining the monitor.
    lifecycle: Mutex<()>,
    /// The writer lives here; a send holds this lock for the whole write.
    port: Mutex<Option<OpenPort>>,
    /// Checked before any native handle is touched on the close paths.
    open: AtomicBool,
}

impl SafeSerialHandle {
    pub fn new(backend: Arc<dyn SerialBackend>) -> Self {
        Self {
            backend,
            lifecycle: Mutex::new(()),
            port: Mutex::new(None),
            open: AtomicBool::new(false),
        }
    }

    /// The backend this handle opens ports through.
    pub fn backend(&self) -> &Arc<dyn SerialBackend> {
        &self.backend
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Open the port and start delivering arrivals to `handler`.
    ///
    /// Does nothing if the handle is already open.
    pub fn open(&self, settings: &PortSettings, handler: ArrivalHandler) -> Result<(), PortError> {
        let _lifecycle = self.lifecycle.lock();
        if self.is_open() {
            return Ok(());
        }

        settings.validate()?;
        let writer = self.backend.open(settings)?;

        let monitor = match writer
            .try_clone()
            .and_then(|reader| ArrivalMonitor::spawn(reader, settings.poll_interval, handler))
        {
            Ok(monitor) => monitor,
            Err(e) => {
                let _ = writer.close();
                return Err(e);
            }
        };

        *self.port.lock() = Some(OpenPort { writer, monitor });
        self.open.store(true, Ordering::Release);
        debug!(port = %settings, "serial handle opened");
        Ok(())
    }

    /// Close the port, reporting a failure of the native close.
    ///
    /// Does nothing if the handle is already closed. Safe to call from an
    /// arrival handler and concurrently with an in-flight read.
    pub fn close(&self) -> Result<(), PortError> {
        let taken = {
            let _lifecycle = self.lifecycle.lock();
            if !self.open.swap(false, Ordering::AcqRel) {
                return Ok(());
            }
            self.port.lock().take()
        };

        let Some(OpenPort { writer, monitor }) = taken else {
            return Ok(());
        };

        monitor.stop();
        let name = writer.name().to_owned();
        let result = writer.close();
        debug!(port = %name, ok = result.is_ok(), "serial handle closed");
        result
    }

    /// Write all of `data` to the open port.
    pub fn write_all(&self, data: &[u8]) -> Result<(), PortError> {
        let mut port = self.port.lock();
        let open = port.as_mut().ok_or(PortError::NotOpen)?;
        open.writer.write_all(data)
    }

    /// Apply a new baud rate to the open port.
    pub fn set_baud_rate(&self, baud_rate: u32) -> Result<(), PortError> {
        let mut port = self.port.lock();
        let open = port.as_mut().ok_or(PortError::NotOpen)?;
        open.writer.set_baud_rate(baud_rate)
    }

    /// Close the port and discard any failure, including a panic from the
    /// transport's close path. A device that is already gone has nothing
    /// left to report.
    pub fn dispose(&self) {
        match panic::catch_unwind(AssertUnwindSafe(|| self.close())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "ignored failure while disposing serial handle"),
            Err(_) => debug!("ignored panic while disposing serial handle"),
        }
    }
}

impl Drop for SafeSerialHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for SafeSerialHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeSerialHandle")
            .field("backend", &self.backend)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::mock::MockBackend;
    use crate::port::monitor::Arrival;

    fn handle_with(backend: &MockBackend) -> SafeSerialHandle {
        SafeSerialHandle::new(Arc::new(backend.clone()))
    }

    fn ignore() -> ArrivalHandler {
        Arc::new(|_: Arrival| {})
    }

    #[test]
    fn test_open_is_idempotent() {
        let backend = MockBackend::new().with_port("COM3");
        let handle = handle_with(&backend);
        let settings = PortSettings::new("COM3", 9600);

        handle.open(&settings, ignore()).unwrap();
        handle.open(&settings, ignore()).unwrap();

        assert!(handle.is_open());
        assert_eq!(backend.open_count("COM3"), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let backend = MockBackend::new().with_port("COM3");
        let handle = handle_with(&backend);

        handle.close().unwrap();
        handle.open(&PortSettings::new("COM3", 9600), ignore()).unwrap();
        handle.close().unwrap();
        handle.close().unwrap();

        assert!(!handle.is_open());
        assert!(!backend.is_in_use("COM3"));
    }

    #[test]
    fn test_invalid_settings_do_not_open() {
        let backend = MockBackend::new().with_port("COM3");
        let handle = handle_with(&backend);

        let result = handle.open(&PortSettings::new("COM3", 0), ignore());
        assert!(matches!(result, Err(PortError::Config(_))));
        assert_eq!(backend.open_count("COM3"), 0);
    }

    #[test]
    fn test_write_requires_open() {
        let handle = handle_with(&MockBackend::new());
        assert!(matches!(handle.write_all(b"x"), Err(PortError::NotOpen)));
    }

    #[test]
    fn test_close_after_removal_reports_io() {
        let backend = MockBackend::new().with_port("COM3");
        let handle = handle_with(&backend);
        handle.open(&PortSettings::new("COM3", 9600), ignore()).unwrap();

        backend.remove_port("COM3");
        let err = handle.close().unwrap_err();
        assert!(err.is_io());
        assert!(!handle.is_open());
    }

    #[test]
    fn test_dispose_swallows_removal() {
        let backend = MockBackend::new().with_port("COM3");
        let handle = handle_with(&backend);
        handle.open(&PortSettings::new("COM3", 9600), ignore()).unwrap();

        backend.remove_port("COM3");
        handle.dispose();
        handle.dispose();
        assert!(!handle.is_open());
    }

    #[test]
    fn test_drop_releases_port() {
        let backend = MockBackend::new().with_port("COM3");
        {
            let handle = handle_with(&backend);
            handle.open(&PortSettings::new("COM3", 9600), ignore()).unwrap();
        }
        assert!(!backend.is_in_use("COM3"));
    }
}
