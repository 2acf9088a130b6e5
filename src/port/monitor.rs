//! Data-arrival monitor.
//!
//! A background thread that watches a reader handle and, whenever the
//! driver reports buffered bytes, reads exactly that many and hands them to
//! an [`ArrivalHandler`].

use super::error::PortError;
use super::traits::SerialTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// What the monitor observed on one notification.
#[derive(Debug)]
pub enum Arrival {
    /// Bytes that were buffered at the moment of the notification.
    Data(Vec<u8>),
    /// Reading failed. The monitor keeps polling unless the device is gone.
    Failed(PortError),
}

/// Callback invoked on the monitor thread for every arrival.
pub type ArrivalHandler = Arc<dyn Fn(Arrival) + Send + Sync>;

/// Handle to a running monitor thread.
#[derive(Debug)]
pub(crate) struct ArrivalMonitor {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ArrivalMonitor {
    /// Start watching `reader`, polling every `poll_interval` while idle.
    pub(crate) fn spawn(
        reader: Box<dyn SerialTransport>,
        poll_interval: Duration,
        handler: ArrivalHandler,
    ) -> Result<Self, PortError> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name(format!("serial-rx-{}", reader.name()))
            .spawn(move || run(reader, poll_interval, handler, thread_stop))?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Stop the thread and wait for it, unless called from the thread itself
    /// (a handler closing its own connection), in which case it exits after
    /// the handler returns.
    pub(crate) fn stop(mut self) {
        self.stop.store(true, Ordering::Release);

        if let Some(thread) = self.thread.take() {
            if thread.thread().id() == thread::current().id() {
                return;
            }
            if thread.join().is_err() {
                warn!("serial arrival monitor panicked");
            }
        }
    }
}

impl Drop for ArrivalMonitor {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

fn run(
    mut reader: Box<dyn SerialTransport>,
    poll_interval: Duration,
    handler: ArrivalHandler,
    stop: Arc<AtomicBool>,
) {
    debug!(port = reader.name(), "arrival monitor started");

    while !stop.load(Ordering::Acquire) {
        let result = match reader.bytes_to_read() {
            Ok(0) => {
                thread::sleep(poll_interval);
                continue;
            }
            Ok(available) => read_available(reader.as_mut(), available),
            Err(e) => Err(e),
        };

        match result {
            // Counted bytes that the read did not return; wait like an idle poll.
            Ok(chunk) if chunk.is_empty() => thread::sleep(poll_interval),
            Ok(chunk) => handler(Arrival::Data(chunk)),
            Err(e) => {
                // A failure caused by our own close is expected.
                if stop.load(Ordering::Acquire) {
                    debug!(port = reader.name(), error = %e, "read interrupted by close");
                    break;
                }

                let removed = e.is_device_removed();
                handler(Arrival::Failed(e));
                if removed {
                    break;
                }
                thread::sleep(poll_interval);
            }
        }
    }

    debug!(port = reader.name(), "arrival monitor stopped");
    // The reader is a clone; its close status belongs to the writer handle.
    let _ = reader.close();
}

/// Read the `available` bytes counted at notification time.
fn read_available(
    reader: &mut dyn SerialTransport,
    available: usize,
) -> Result<Vec<u8>, PortError> {
    let mut buffer = vec![0u8; available];
    let mut filled = 0;

    while filled < available {
        let n = reader.read_bytes(&mut buffer[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    buffer.truncate(filled);
    Ok(buffer)
}
