//! Topic registry over the shared push connection.
//!
//! One process holds a single push connection with many interested
//! components.  Rather than a hidden singleton, the registry is an
//! explicit value: the connection task calls [`RealtimeHub::dispatch`]
//! with each decoded frame, and components subscribe to the topics they
//! care about.  A [`Subscription`] unsubscribes itself when dropped, so
//! handler lifecycle follows component lifecycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Identifies one subscriber within the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    tx: mpsc::UnboundedSender<Value>,
}

struct HubInner {
    next_id: u64,
    topics: HashMap<String, Vec<Subscriber>>,
}

/// Registry mapping topic paths to subscriber handles.
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct RealtimeHub {
    inner: Arc<Mutex<HubInner>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                next_id: 0,
                topics: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().expect("hub lock poisoned")
    }

    /// Register a subscriber for `topic` and return its receiving handle.
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();

        let id = {
            let mut inner = self.lock();
            let id = SubscriptionId(inner.next_id);
            inner.next_id += 1;
            inner
                .topics
                .entry(topic.to_string())
                .or_default()
                .push(Subscriber { id, tx });
            id
        };

        debug!(topic, id = id.0, "Subscribed to topic");

        Subscription {
            id,
            topic: topic.to_string(),
            rx,
            hub: self.clone(),
        }
    }

    /// Remove one subscriber.  Harmless if it is already gone.
    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) {
        let mut inner = self.lock();
        if let Some(subs) = inner.topics.get_mut(topic) {
            subs.retain(|s| s.id != id);
            if subs.is_empty() {
                inner.topics.remove(topic);
            }
            debug!(topic, id = id.0, "Unsubscribed from topic");
        }
    }

    /// Deliver one decoded frame to every live subscriber of `topic`.
    ///
    /// At-most-once per subscriber: nothing is replayed for handles that
    /// subscribe later.  Returns the number of subscribers reached.
    /// Subscribers whose receiving half is gone are pruned here.
    pub fn dispatch(&self, topic: &str, payload: Value) -> usize {
        let mut inner = self.lock();
        let Some(subs) = inner.topics.get_mut(topic) else {
            trace!(topic, "Frame for topic with no subscribers");
            return 0;
        };

        subs.retain(|s| !s.tx.is_closed());

        let mut delivered = 0;
        for sub in subs.iter() {
            if sub.tx.send(payload.clone()).is_ok() {
                delivered += 1;
            }
        }

        if subs.is_empty() {
            inner.topics.remove(topic);
        }

        trace!(topic, delivered, "Dispatched frame");
        delivered
    }

    /// Number of live subscribers currently registered for `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.lock().topics.get(topic).map_or(0, Vec::len)
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One component's handle on a topic.  Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriptionId,
    topic: String,
    rx: mpsc::UnboundedReceiver<Value>,
    hub: RealtimeHub,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Receive the next payload delivered on this topic.  Returns `None`
    /// once the subscription has been removed from the hub.
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.topic, self.id);
    }
}
