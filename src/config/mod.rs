//! Configuration module for serial-connection.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SERIAL_CONNECTION_CONFIG` environment variable (explicit path)
//! 2. `./serial-connection.toml` (current directory)
//! 3. `serial-connection.toml` in the per-user configuration directory
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `SERIAL_CONNECTION_<SECTION>_<KEY>`
//!
//! Examples:
//! - `SERIAL_CONNECTION_SERIAL_PORT=COM3`
//! - `SERIAL_CONNECTION_SERIAL_BAUD_RATE=115200`
//! - `SERIAL_CONNECTION_SERIAL_TIMEOUT_MS=500`
//! - `SERIAL_CONNECTION_SERIAL_POLL_INTERVAL_MS=5`
//! - `SERIAL_CONNECTION_LOGGING_LEVEL=debug`
//!
//! # Example
//!
//! ```rust,no_run
//! use serial_connection::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Default baud: {}", config.serial.baud_rate);
//! # Ok::<(), serial_connection::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig};
