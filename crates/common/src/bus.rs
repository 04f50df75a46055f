//! Synchronous multi-subscriber event bus.
//!
//! Every [`EventBus::publish`] call invokes each handler that was subscribed
//! at the moment of publishing, in subscription order, on the caller's task.
//! A handler that panics is isolated: the panic is caught, logged, and counted
//! in that handler's [`HandlerStats`] while the remaining handlers still run.

use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use tracing::{debug, warn};

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

// ── HandlerStats ────────────────────────────────────────────────────────────

/// Per-subscription delivery counters.
#[derive(Debug, Default)]
pub struct HandlerStats {
    pub delivered: AtomicU64,
    pub panicked: AtomicU64,
}

impl HandlerStats {
    fn record(&self, ok: bool) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.panicked.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn panicked(&self) -> u64 {
        self.panicked.load(Ordering::Relaxed)
    }
}

// ── Entries ─────────────────────────────────────────────────────────────────

struct Entry<T> {
    id: u64,
    handler: Handler<T>,
    /// Set for one-shot subscriptions; flipped on first delivery.
    once: Option<Arc<AtomicBool>>,
    stats: Arc<HandlerStats>,
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
            once: self.once.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}

struct Inner<T> {
    name: &'static str,
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry<T>>>,
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64) -> bool;
}

impl<T: 'static> Detach for Inner<T> {
    fn detach(&self, id: u64) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|e| e.id != id);
        before != entries.len()
    }
}

// ── Subscription ────────────────────────────────────────────────────────────

/// Handle returned by [`EventBus::subscribe`] and [`EventBus::once`].
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription {
    id: u64,
    bus: Weak<dyn Detach>,
    stats: Arc<HandlerStats>,
}

impl Subscription {
    /// Remove the handler. Returns `false` if it was already removed (or the
    /// one-shot handler already fired).
    pub fn unsubscribe(&self) -> bool {
        self.bus.upgrade().is_some_and(|bus| bus.detach(self.id))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn stats(&self) -> Arc<HandlerStats> {
        Arc::clone(&self.stats)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

// ── EventBus ────────────────────────────────────────────────────────────────

/// Fan-out of `T` events to any number of synchronous handlers.
///
/// Cloning yields another handle to the same bus.
pub struct EventBus<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::named("bus")
    }
}

impl<T: 'static> EventBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bus whose name appears in diagnostics.
    pub fn named(name: &'static str) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                next_id: AtomicU64::new(1),
                entries: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Persistent subscription: `handler` receives every event published until
    /// the returned subscription is unsubscribed.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.insert(Arc::new(handler), None)
    }

    /// One-shot subscription: `handler` receives the next event only.
    pub fn once<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.insert(Arc::new(handler), Some(Arc::new(AtomicBool::new(false))))
    }

    fn insert(&self, handler: Handler<T>, once: Option<Arc<AtomicBool>>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let stats = Arc::new(HandlerStats::default());
        {
            let mut entries = self.inner.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.push(Entry {
                id,
                handler,
                once,
                stats: Arc::clone(&stats),
            });
        }
        debug!(bus = self.inner.name, subscription = id, "handler subscribed");
        let inner: Arc<dyn Detach> = self.inner.clone();
        Subscription {
            id,
            bus: Arc::downgrade(&inner),
            stats,
        }
    }

    /// Deliver `event` to every handler subscribed at call time.
    ///
    /// Handlers added while this call runs miss the event; handlers removed
    /// while it runs still receive it.
    pub fn publish(&self, event: &T) {
        let snapshot: Vec<Entry<T>> = {
            let entries = self.inner.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.clone()
        };

        for entry in snapshot {
            if let Some(fired) = &entry.once {
                if fired.swap(true, Ordering::AcqRel) {
                    continue;
                }
                self.inner.detach(entry.id);
            }

            let outcome = catch_unwind(AssertUnwindSafe(|| (entry.handler)(event)));
            entry.stats.record(outcome.is_ok());
            if let Err(panic) = outcome {
                warn!(
                    bus = self.inner.name,
                    subscription = entry.id,
                    panic = %panic_message(panic.as_ref()),
                    "event handler panicked"
                );
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".into()
    }
}
