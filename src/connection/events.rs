//! Data-arrival notifications and the subscriber registry behind them.

use crate::error::ConnectionError;
use parking_lot::RwLock;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The bytes that were available at one arrival notification.
///
/// Immutable and cheap to clone; no assembly across notifications happens.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct InboundChunk(Arc<[u8]>);

impl InboundChunk {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl From<Vec<u8>> for InboundChunk {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl Deref for InboundChunk {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for InboundChunk {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for InboundChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InboundChunk").field(&&*self.0).finish()
    }
}

/// Payload of a data-received notification.
#[derive(Debug, Clone)]
pub struct DataReceived {
    /// Identity of the connection, as rendered by its `Display`.
    pub source: String,
    /// The bytes that arrived.
    pub data: InboundChunk,
}

/// Handler for data-received notifications.
pub type DataHandler = Arc<dyn Fn(&DataReceived) + Send + Sync>;

/// Handler for failures raised on the arrival path.
pub type ErrorHandler = Arc<dyn Fn(&ConnectionError) + Send + Sync>;

/// Token returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Thread-safe list of handlers.
///
/// Delivery invokes a snapshot of the list outside the lock, so handlers may
/// subscribe or unsubscribe from inside a callback.
pub(crate) struct Subscribers<H: ?Sized> {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(SubscriptionId, Arc<H>)>>,
}

impl<H: ?Sized> Subscribers<H> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self, handler: Arc<H>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, handler));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    pub(crate) fn clear(&self) {
        self.handlers.write().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<H>> {
        self.handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }
}
