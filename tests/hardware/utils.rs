//! Utility functions for hardware testing.
//!
//! Provides helpers for port discovery and test configuration.

use serial_connection::{NativeBackend, PortSettings, SerialConnection};
use serialport::{available_ports, SerialPortInfo};
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Test port configuration from environment.
pub struct TestPortConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub loopback_enabled: bool,
}

impl TestPortConfig {
    /// Get test configuration from environment variables.
    pub fn from_env() -> Option<Self> {
        let port_name = env::var("TEST_PORT").ok()?;
        let baud_rate = env::var("TEST_BAUD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(9600);
        let loopback_enabled = env::var("TEST_LOOPBACK").ok().as_deref() == Some("1");

        Some(TestPortConfig {
            port_name,
            baud_rate,
            loopback_enabled,
        })
    }

    /// Settings for the configured port.
    pub fn to_settings(&self) -> PortSettings {
        PortSettings::new(self.port_name.as_str(), self.baud_rate)
            .with_timeout(Duration::from_millis(1000))
    }

    /// A native connection to the configured port.
    pub fn connection(&self) -> SerialConnection {
        SerialConnection::with_backend(self.to_settings(), Arc::new(NativeBackend::new()))
    }
}

/// Discover all available serial ports on the system.
pub fn discover_available_ports() -> Vec<SerialPortInfo> {
    available_ports().unwrap_or_default()
}

/// Check if a specific port is available.
pub fn is_port_available(port_name: &str) -> bool {
    discover_available_ports()
        .iter()
        .any(|p| p.port_name == port_name)
}
