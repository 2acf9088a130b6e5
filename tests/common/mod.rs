//! Shared test utilities for connection tests.
//!
//! This module provides:
//! - Connections wired to a `MockBackend`
//! - Recorders that collect data and error notifications
//! - A polling helper for asynchronous delivery

#![allow(dead_code)]

use parking_lot::Mutex;
use serial_connection::{
    Connection, ConnectionError, ConnectionErrorKind, DataReceived, MockBackend, PortSettings,
    SerialConnection,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How long asynchronous delivery is given before a test fails.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Build a connection on `backend` with a short poll interval.
pub fn mock_connection(backend: &MockBackend, port: &str, baud: u32) -> SerialConnection {
    let settings = PortSettings::new(port, baud).with_poll_interval(Duration::from_millis(1));
    SerialConnection::with_backend(settings, Arc::new(backend.clone()))
}

/// Poll `condition` until it holds or `DELIVERY_TIMEOUT` passes.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + DELIVERY_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Collects every data notification a connection emits.
#[derive(Clone, Default)]
pub struct DataRecorder {
    events: Arc<Mutex<Vec<DataReceived>>>,
}

impl DataRecorder {
    /// Subscribe a new recorder to `conn`.
    pub fn attach(conn: &impl Connection) -> Self {
        let recorder = Self::default();
        let events = Arc::clone(&recorder.events);
        conn.subscribe(Arc::new(move |event: &DataReceived| {
            events.lock().push(event.clone());
        }));
        recorder
    }

    /// Concatenation of every chunk received so far.
    pub fn bytes(&self) -> Vec<u8> {
        self.events
            .lock()
            .iter()
            .flat_map(|event| event.data.to_vec())
            .collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn sources(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|event| event.source.clone())
            .collect()
    }

    /// Wait until at least `len` bytes have arrived.
    pub fn wait_for_len(&self, len: usize) -> Vec<u8> {
        wait_until(|| self.bytes().len() >= len);
        self.bytes()
    }
}

/// Collects every asynchronous error a connection raises.
#[derive(Clone, Default)]
pub struct ErrorRecorder {
    errors: Arc<Mutex<Vec<(ConnectionErrorKind, bool)>>>,
}

impl ErrorRecorder {
    /// Subscribe a new recorder to `conn`'s error notifications.
    pub fn attach(conn: &impl Connection) -> Self {
        let recorder = Self::default();
        let errors = Arc::clone(&recorder.errors);
        conn.subscribe_errors(Arc::new(move |err: &ConnectionError| {
            let removed = err
                .port_error()
                .map(|e| e.is_device_removed())
                .unwrap_or(false);
            errors.lock().push((err.kind(), removed));
        }));
        recorder
    }

    /// `(kind, device_removed)` for every error raised so far.
    pub fn errors(&self) -> Vec<(ConnectionErrorKind, bool)> {
        self.errors.lock().clone()
    }
}
