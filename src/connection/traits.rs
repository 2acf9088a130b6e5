//! The transport-agnostic connection contract.

use super::events::{DataHandler, ErrorHandler, SubscriptionId};
use crate::error::ConnectionResult;
use std::fmt;

/// A byte-stream connection that can be opened, written to and closed, and
/// that notifies subscribers when bytes arrive.
///
/// `Display` renders the connection's identity, which is also the `source`
/// of every [`DataReceived`](super::DataReceived) it emits.
pub trait Connection: Send + Sync + fmt::Display {
    /// Open the connection. Does nothing if it is already open.
    fn connect(&self) -> ConnectionResult<()>;

    /// Close the connection. Does nothing if it is already closed.
    fn disconnect(&self) -> ConnectionResult<()>;

    /// Write all of `data`.
    fn send(&self, data: &[u8]) -> ConnectionResult<()>;

    fn is_connected(&self) -> bool;

    /// Register a handler for arriving data.
    ///
    /// Registering on a disposed connection is accepted, but the handler is
    /// never called.
    fn subscribe(&self, handler: DataHandler) -> SubscriptionId;

    /// Remove a data handler. Returns whether it was registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Register a handler for failures raised while receiving, which have
    /// no caller to return to. Like [`subscribe`](Self::subscribe), this
    /// accepts handlers after dispose without ever calling them.
    fn subscribe_errors(&self, handler: ErrorHandler) -> SubscriptionId;

    /// Remove an error handler. Returns whether it was registered.
    fn unsubscribe_errors(&self, id: SubscriptionId) -> bool;

    /// Disconnect and release every resource. Later operations fail.
    /// Calling it again does nothing.
    fn dispose(&self);
}
