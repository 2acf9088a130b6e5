//! Connection layer.
//!
//! Defines the generic [`Connection`] contract, the data-arrival events it
//! emits, and [`SerialConnection`], its implementation over a serial port.

pub mod events;
pub mod serial;
pub mod traits;

pub use events::{DataHandler, DataReceived, ErrorHandler, InboundChunk, SubscriptionId};
pub use serial::SerialConnection;
pub use traits::Connection;
