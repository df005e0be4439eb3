use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Ordered collection of pending listeners on one response endpoint.
///
/// Every dispatched packet fans out to all registered listeners, in
/// registration order. Listeners are appended by each request and removed on
/// fulfillment or timeout.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    listeners: Vec<Listener>,
}

#[derive(Debug)]
struct Listener {
    id: u64,
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener; returns its handle and the packet stream it will
    /// receive notifications on.
    pub fn register(&self) -> (u64, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push(Listener { id, tx });
        (id, rx)
    }

    /// Remove a listener by handle. Idempotent.
    pub fn remove(&self, id: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.listeners.retain(|listener| listener.id != id);
    }

    /// Fan a packet out to every registered listener, in registration order.
    pub fn dispatch(&self, packet: Bytes) {
        let inner = self.inner.lock().unwrap();
        for listener in &inner.listeners {
            // A listener whose receiver is already gone gets cleaned up by its
            // own removal path.
            let _ = listener.tx.send(packet.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
