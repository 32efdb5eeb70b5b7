//! Event Bus - Synchronous publish/subscribe between consent components
//!
//! Every consent transition flows through this bus, decoupling the component
//! that changes state from the components that react to it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Event Bus (ordered subscriptions)            │
//! │                                                              │
//! │  Producers:                    Consumers:                    │
//! │  ├─ CookieManager              ├─ ConsentStore (mirror)      │
//! │  ├─ ServiceLoader              ├─ ServiceLoader (inject)     │
//! │  └─ ConsentManager             ├─ ConsentRevoke (teardown)   │
//! │                                └─ Host callbacks             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Delivery
//!
//! - `emit` runs every callback registered for the event when the emit
//!   started, synchronously and in subscription order.
//! - Callbacks subscribed during a dispatch only see later emissions.
//! - A callback unsubscribed during a dispatch is not invoked afterwards.
//! - A failing or panicking callback is logged; the others still run.
//!
//! # Usage
//!
//! ```ignore
//! let bus = EventBus::new();
//! let sub = bus.subscribe("analytics-enabled", |_event| {
//!     println!("analytics allowed");
//!     Ok(())
//! });
//! bus.emit("analytics-enabled", None);
//! sub.unsubscribe();
//! ```

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, warn};

use crate::domain::{ConsentEvent, Event};

/// Nested emissions deeper than this are dropped
const MAX_DISPATCH_DEPTH: usize = 32;

/// Callback invoked for every matching emission
pub type Listener = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

/// Unique, monotonically increasing subscription identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    topics: HashMap<String, BTreeMap<SubscriptionId, Listener>>,
}

#[derive(Default)]
struct Inner {
    registry: Mutex<Registry>,
    depth: AtomicUsize,
}

struct DepthGuard<'a>(&'a AtomicUsize);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Event Bus - hub for consent event distribution
///
/// Cheap to clone; clones share the same subscriptions. Each consent manager
/// owns its own bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for the named event
    pub fn subscribe<F>(&self, event: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let event = event.into();
        let mut registry = self.inner.registry.lock();
        registry.next_id += 1;
        let id = SubscriptionId(registry.next_id);
        registry
            .topics
            .entry(event.clone())
            .or_default()
            .insert(id, Arc::new(callback));

        debug!(event = %event, id = id.0, "[EventBus] Subscribed");

        Subscription {
            event,
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to its current subscribers
    pub fn emit(&self, event: &str, payload: Option<Value>) {
        let depth = self.inner.depth.fetch_add(1, Ordering::SeqCst);
        let _guard = DepthGuard(&self.inner.depth);
        if depth >= MAX_DISPATCH_DEPTH {
            error!(
                event = event,
                depth = depth,
                "[EventBus] Dispatch depth exceeded, dropping event"
            );
            return;
        }

        let snapshot: Vec<(SubscriptionId, Listener)> = {
            let registry = self.inner.registry.lock();
            match registry.topics.get(event) {
                Some(listeners) => listeners
                    .iter()
                    .map(|(id, listener)| (*id, listener.clone()))
                    .collect(),
                None => Vec::new(),
            }
        };

        if snapshot.is_empty() {
            debug!(event = event, "[EventBus] No subscribers for event");
            return;
        }

        debug!(
            event = event,
            receivers = snapshot.len(),
            "[EventBus] Emitting event"
        );

        let delivered = Event::new(event, payload);
        for (id, listener) in snapshot {
            if !self.is_subscribed(event, id) {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| listener(&delivered))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(
                        event = event,
                        id = id.0,
                        error = %e,
                        "[EventBus] Listener failed"
                    );
                }
                Err(_) => {
                    error!(event = event, id = id.0, "[EventBus] Listener panicked");
                }
            }
        }
    }

    /// Emit a typed consent event
    pub fn emit_event(&self, event: &ConsentEvent) {
        self.emit(&event.name(), event.payload());
    }

    /// Number of callbacks currently registered for an event
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.inner
            .registry
            .lock()
            .topics
            .get(event)
            .map(|listeners| listeners.len())
            .unwrap_or(0)
    }

    fn is_subscribed(&self, event: &str, id: SubscriptionId) -> bool {
        self.inner
            .registry
            .lock()
            .topics
            .get(event)
            .map(|listeners| listeners.contains_key(&id))
            .unwrap_or(false)
    }
}

/// Handle returned by [`EventBus::subscribe`]
///
/// Dropping the handle keeps the subscription alive; call
/// [`Subscription::unsubscribe`] to cancel it.
#[derive(Clone)]
pub struct Subscription {
    event: String,
    id: SubscriptionId,
    bus: Weak<Inner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    /// Stop receiving emissions. Safe to call during a dispatch and more than once.
    pub fn unsubscribe(&self) {
        let Some(inner) = self.bus.upgrade() else {
            return;
        };
        let mut registry = inner.registry.lock();
        if let Some(listeners) = registry.topics.get_mut(&self.event) {
            listeners.remove(&self.id);
            if listeners.is_empty() {
                registry.topics.remove(&self.event);
            }
        }
        debug!(event = %self.event, id = self.id.0, "[EventBus] Unsubscribed");
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
