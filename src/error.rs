use crate::port::PortError;
use std::fmt;
use thiserror::Error;

/// A specialized `Result` type for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Which operation a [`ConnectionError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionErrorKind {
    /// The native open was rejected.
    Open,
    /// The native close was rejected for a reason other than a removed device.
    Close,
    /// The native write was rejected.
    Send,
    /// Reading arrived data failed on the monitor thread.
    Receive,
    /// A setting could not be changed in the current state.
    Config,
    /// The connection was used after `dispose`.
    Disposed,
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Send => "send",
            Self::Receive => "receive",
            Self::Config => "config",
            Self::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// The single error type surfaced by a connection.
///
/// Carries a message and, when the failure came from the port, the
/// underlying [`PortError`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConnectionError {
    kind: ConnectionErrorKind,
    message: String,
    #[source]
    source: Option<PortError>,
}

impl ConnectionError {
    pub fn new(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ConnectionErrorKind,
        message: impl Into<String>,
        source: PortError,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source),
        }
    }

    pub(crate) fn open(source: PortError) -> Self {
        Self::with_source(ConnectionErrorKind::Open, "Failed to open port.", source)
    }

    pub(crate) fn close(source: PortError) -> Self {
        Self::with_source(ConnectionErrorKind::Close, "Failed to close port.", source)
    }

    pub(crate) fn send(source: PortError) -> Self {
        Self::with_source(ConnectionErrorKind::Send, "Failed to send data.", source)
    }

    pub(crate) fn receive(source: PortError) -> Self {
        Self::with_source(
            ConnectionErrorKind::Receive,
            "Error reading data from port.",
            source,
        )
    }

    pub(crate) fn disposed() -> Self {
        Self::new(
            ConnectionErrorKind::Disposed,
            "The connection has been disposed.",
        )
    }

    pub fn kind(&self) -> ConnectionErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The port failure behind this error, if any.
    pub fn port_error(&self) -> Option<&PortError> {
        self.source.as_ref()
    }
}
