//! Serial Connection Library
//!
//! A connection endpoint over a serial (COM) port that sends raw bytes,
//! delivers arriving bytes to subscribers, and survives the abrupt removal
//! of USB-backed or virtual ports.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `connection`: The `Connection` contract and `SerialConnection`
//! - `error`: Unified connection error
//! - `logging`: Tracing subscriber setup
//! - `port`: Port abstraction layer (native and mock backends, safe handle)

pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod port;

// Re-export commonly used types for convenience
pub use connection::{
    Connection, DataHandler, DataReceived, ErrorHandler, InboundChunk, SerialConnection,
    SubscriptionId,
};
pub use error::{ConnectionError, ConnectionErrorKind, ConnectionResult};
pub use port::{
    MockBackend, NativeBackend, PortError, PortSettings, SafeSerialHandle, SerialBackend,
    SerialTransport,
};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
