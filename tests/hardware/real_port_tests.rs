//! Tests requiring actual serial hardware.
//!
//! These tests are skipped if no hardware is available.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! # Set environment variables
//! export TEST_PORT=COM3                  # or /dev/ttyUSB0 on Linux
//! export TEST_BAUD=9600                  # optional, default: 9600
//! export TEST_LOOPBACK=1                 # if port has TX-RX loopback
//!
//! # Run tests
//! cargo test --features hardware-tests -- --ignored
//! ```
//!
//! For the unplug test, set `TEST_UNPLUG=1` and remove the USB adapter when
//! prompted.

use super::utils::{is_port_available, TestPortConfig};
use crate::common::{DataRecorder, ErrorRecorder};
use serial_connection::{Connection, SerialConnection};
use std::env;
use std::time::{Duration, Instant};

/// Skip test if hardware is not available.
fn skip_without_hardware() -> Option<TestPortConfig> {
    let config = TestPortConfig::from_env();
    if config.is_none() {
        println!("⏭️  Skipping hardware test: TEST_PORT not set");
    }
    config
}

#[test]
#[ignore] // Run with --ignored flag
fn test_real_port_connect_disconnect() {
    let Some(config) = skip_without_hardware() else {
        return;
    };
    println!("Testing port: {} at {} baud", config.port_name, config.baud_rate);
    assert!(is_port_available(&config.port_name));

    let conn = config.connection();
    conn.connect().expect("Port open failed");
    assert!(conn.is_connected());
    conn.connect().expect("Second connect must be a no-op");

    conn.disconnect().expect("Port close failed");
    assert!(!conn.is_connected());
    conn.disconnect().expect("Second disconnect must be a no-op");

    println!("✅ Port connect/disconnect test passed");
}

#[test]
#[ignore]
fn test_real_port_loopback_communication() {
    let Some(config) = skip_without_hardware() else {
        return;
    };
    if !config.loopback_enabled {
        println!("⏭️  Skipping loopback test: TEST_LOOPBACK not set to 1");
        return;
    }

    let conn = config.connection();
    let received = DataRecorder::attach(&conn);
    conn.connect().expect("Failed to open port");

    let test_data = b"LOOPBACK TEST\r\n";
    conn.send(test_data).expect("Failed to write to port");

    assert_eq!(
        received.wait_for_len(test_data.len()),
        test_data.to_vec(),
        "Loopback data should match written data"
    );
    println!("✅ Loopback test passed in {} chunk(s)", received.chunk_count());
}

#[test]
#[ignore]
fn test_real_port_missing_device() {
    let conn = SerialConnection::new("COM999", 9600);
    assert!(conn.connect().is_err());
    assert!(!conn.is_connected());
}

#[test]
#[ignore]
fn test_real_port_unplug() {
    let Some(config) = skip_without_hardware() else {
        return;
    };
    if env::var("TEST_UNPLUG").ok().as_deref() != Some("1") {
        println!("⏭️  Skipping unplug test: TEST_UNPLUG not set to 1");
        return;
    }

    let conn = config.connection();
    let errors = ErrorRecorder::attach(&conn);
    conn.connect().expect("Failed to open port");

    println!("🔌 Unplug {} now...", config.port_name);
    let deadline = Instant::now() + Duration::from_secs(30);
    while is_port_available(&config.port_name) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(100));
    }
    let unplugged = !is_port_available(&config.port_name);
    std::thread::sleep(Duration::from_millis(200));

    conn.disconnect()
        .expect("Disconnect after removal must not report an error");
    conn.dispose();

    println!(
        "✅ Unplug test passed (unplugged: {}, receive errors: {})",
        unplugged,
        errors.errors().len()
    );
}
