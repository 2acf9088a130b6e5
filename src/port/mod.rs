//! Port abstraction layer for serial communication.
//!
//! Provides the transport traits, the native `serialport` backend, a mock
//! backend for tests, and the crash-safe handle the connection is built on.

pub mod error;
pub mod handle;
pub mod mock;
pub mod monitor;
pub mod native;
pub mod traits;

pub use error::PortError;
pub use handle::SafeSerialHandle;
pub use mock::{MockBackend, MockTransport};
pub use monitor::{Arrival, ArrivalHandler};
pub use native::{NativeBackend, NativeTransport};
pub use traits::*;
