use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcast topic with bounded capacity.
/// `T` must be `Send + Sync` because we hop across threads.
#[derive(Debug, Clone)]
pub struct Topic<T> {
    name: &'static str,
    tx: broadcast::Sender<Arc<T>>,
}

impl<T: Send + Sync + 'static> Topic<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { name, tx }
    }

    pub fn publish(&self, msg: T) {
        if self.tx.send(Arc::new(msg)).is_err() {
            trace!(topic = self.name, "No subscribers, message dropped");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }

    /// The underlying sender, for components that subscribe on demand.
    pub fn sender(&self) -> broadcast::Sender<Arc<T>> {
        self.tx.clone()
    }
}
