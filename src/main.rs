use clap::{Parser, Subcommand};
use serial_connection::config::{Config, ConfigLoader};
use serial_connection::{logging, Connection, InboundChunk, SerialConnection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "serial-connect",
    version,
    about = "Talk to a serial port: print what arrives, send what you type.",
    long_about = "Opens a serial port with 8N1 framing, prints every chunk of received bytes to stdout and sends each line read from stdin. Survives the port's USB device being unplugged."
)]
struct Args {
    /// Configuration file to use instead of the standard locations.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the serial ports present on this machine.
    List,
    /// Open a port and bridge it to stdin/stdout.
    Open {
        /// Port name or configured alias. Defaults to `serial.port` from the config.
        port: Option<String>,

        /// Baud rate. Defaults to `serial.baud_rate` from the config.
        #[arg(short, long)]
        baud: Option<u32>,

        /// Print received bytes as hex instead of raw.
        #[arg(long)]
        hex: bool,

        /// Terminate sent lines with CR LF instead of LF.
        #[arg(long)]
        crlf: bool,
    },
}

/// What the connection's subscribers forward to the terminal loop.
enum Event {
    Data(InboundChunk),
    Failed(String),
}

// --- Main Application Entry Point ---
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Failed to load config, using defaults: {}", e);
            ConfigLoader::with_defaults().into_config()
        }
    };
    logging::init(&config.logging);

    match args.command {
        Command::List => list_ports(),
        Command::Open {
            port,
            baud,
            hex,
            crlf,
        } => run_terminal(&config, port, baud, hex, crlf).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, serial_connection::ConfigError> {
    let loader = match path {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    Ok(loader.into_config())
}

fn list_ports() -> Result<(), Box<dyn std::error::Error>> {
    let ports = SerialConnection::available_ports()?;
    if ports.is_empty() {
        eprintln!("No serial ports found");
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}

async fn run_terminal(
    config: &Config,
    port: Option<String>,
    baud: Option<u32>,
    hex: bool,
    crlf: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let port = port
        .or_else(|| config.serial.port.clone())
        .ok_or("no port given and serial.port is not configured")?;

    let mut settings = config.serial.port_settings(&port);
    if let Some(baud) = baud {
        settings.baud_rate = baud;
    }

    let connection = SerialConnection::with_backend(
        settings,
        Arc::new(serial_connection::NativeBackend::new()),
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let data_tx = tx.clone();
    connection.subscribe(Arc::new(move |event: &serial_connection::DataReceived| {
        let _ = data_tx.send(Event::Data(event.data.clone()));
    }));
    connection.subscribe_errors(Arc::new(move |err: &serial_connection::ConnectionError| {
        let cause = err
            .port_error()
            .map(|e| format!(": {}", e))
            .unwrap_or_default();
        let _ = tx.send(Event::Failed(format!("{}{}", err, cause)));
    }));

    connection.connect()?;
    info!(connection = %connection, "connected");

    let eol: &[u8] = if crlf { b"\r\n" } else { b"\n" };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let outcome: Result<(), Box<dyn std::error::Error>> = loop {
        tokio::select! {
            Some(event) = rx.recv() => match event {
                Event::Data(chunk) => {
                    let rendered = if hex { render_hex(&chunk) } else { chunk.to_vec() };
                    stdout.write_all(&rendered).await?;
                    stdout.flush().await?;
                }
                Event::Failed(message) => break Err(message.into()),
            },
            line = lines.next_line() => match line? {
                Some(line) => {
                    let mut bytes = line.into_bytes();
                    bytes.extend_from_slice(eol);
                    if let Err(e) = connection.send(&bytes) {
                        break Err(e.into());
                    }
                }
                None => break Ok(()),
            },
            _ = &mut shutdown => break Ok(()),
        }
    };

    connection.dispose();
    info!(connection = %connection, "closed");
    outcome
}

fn render_hex(bytes: &[u8]) -> Vec<u8> {
    let mut line = bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ");
    line.push('\n');
    line.into_bytes()
}

// --- Graceful Shutdown Handler ---
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, shutting down");
}
