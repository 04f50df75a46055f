//! Gateway-fed cache set.
//!
//! The layer owns one [`ObjectCache`] per entity kind plus the current user
//! and a [`ReadyGate`]. It is the only writer; everyone else reads copies.

use std::sync::{Arc, RwLock};

use {
    breadcord_common::{ArrayStrategy, EventBus, Subscription},
    breadcord_protocol::{GatewayFrame, Opcode, dispatch},
    serde_json::Value,
    tracing::{debug, info, warn},
};

use crate::{
    key::CacheKey,
    merge::merge_records,
    ready::ReadyGate,
    store::{ObjectCache, Record},
};

/// Every cache the layer maintains.
#[derive(Debug)]
pub struct CacheSet {
    pub users: ObjectCache,
    pub guilds: ObjectCache,
    /// Direct-message channels.
    pub private_channels: ObjectCache,
    /// Friends, blocks and pending requests.
    pub relationships: ObjectCache,
    pub messages: ObjectCache,
    pub current_user: Option<Record>,
}

impl CacheSet {
    fn new(strategy: ArrayStrategy) -> Self {
        Self {
            users: ObjectCache::new(strategy),
            guilds: ObjectCache::new(strategy),
            private_channels: ObjectCache::new(strategy),
            relationships: ObjectCache::new(strategy),
            messages: ObjectCache::new(strategy),
            current_user: None,
        }
    }
}

#[derive(Clone)]
pub struct CacheLayer {
    caches: Arc<RwLock<CacheSet>>,
    ready: ReadyGate,
}

impl Default for CacheLayer {
    fn default() -> Self {
        Self::new(ArrayStrategy::default())
    }
}

impl CacheLayer {
    pub fn new(strategy: ArrayStrategy) -> Self {
        Self {
            caches: Arc::new(RwLock::new(CacheSet::new(strategy))),
            ready: ReadyGate::new(),
        }
    }

    /// Subscribe to gateway frames on `bus`.
    pub fn attach(&self, bus: &EventBus<GatewayFrame>) -> Subscription {
        let layer = self.clone();
        bus.subscribe(move |frame| layer.handle_frame(frame))
    }

    /// Run `f` against the caches under a read lock.
    pub fn read<R>(&self, f: impl FnOnce(&CacheSet) -> R) -> R {
        let caches = self.caches.read().unwrap_or_else(|e| e.into_inner());
        f(&caches)
    }

    pub fn current_user(&self) -> Option<Record> {
        self.read(|c| c.current_user.clone())
    }

    pub fn user(&self, id: impl Into<CacheKey>) -> Option<Record> {
        self.read(|c| c.users.get(id))
    }

    pub fn guild(&self, id: impl Into<CacheKey>) -> Option<Record> {
        self.read(|c| c.guilds.get(id))
    }

    pub fn private_channel(&self, id: impl Into<CacheKey>) -> Option<Record> {
        self.read(|c| c.private_channels.get(id))
    }

    pub fn relationship(&self, id: impl Into<CacheKey>) -> Option<Record> {
        self.read(|c| c.relationships.get(id))
    }

    pub fn message(&self, id: impl Into<CacheKey>) -> Option<Record> {
        self.read(|c| c.messages.get(id))
    }

    pub fn ready_gate(&self) -> &ReadyGate {
        &self.ready
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_open()
    }

    /// Run `callback` once READY has been cached (immediately if it has).
    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.ready.on_ready(callback);
    }

    /// Apply one gateway frame. Non-dispatch frames are ignored.
    pub fn handle_frame(&self, frame: &GatewayFrame) {
        if frame.opcode() != Opcode::Dispatch {
            return;
        }
        let Some(name) = frame.event_name() else {
            return;
        };

        if name == dispatch::READY {
            self.load_ready(&frame.d);
            self.ready.open();
            return;
        }

        let mut guard = self.caches.write().unwrap_or_else(|e| e.into_inner());
        let caches = &mut *guard;
        let d = &frame.d;
        match name {
            dispatch::GUILD_CREATE | dispatch::GUILD_UPDATE => {
                upsert(&mut caches.guilds, "guild", d);
            },
            dispatch::GUILD_DELETE => remove(&mut caches.guilds, "guild", d),
            dispatch::CHANNEL_CREATE | dispatch::CHANNEL_UPDATE if is_private(d) => {
                upsert(&mut caches.private_channels, "channel", d);
            },
            dispatch::CHANNEL_DELETE if is_private(d) => {
                remove(&mut caches.private_channels, "channel", d);
            },
            dispatch::MESSAGE_CREATE | dispatch::MESSAGE_UPDATE => {
                upsert(&mut caches.messages, "message", d);
                if let Some(author) = d.get("author") {
                    upsert(&mut caches.users, "user", author);
                }
            },
            dispatch::MESSAGE_DELETE => remove(&mut caches.messages, "message", d),
            dispatch::RELATIONSHIP_ADD => {
                upsert(&mut caches.relationships, "relationship", d);
            },
            dispatch::RELATIONSHIP_REMOVE => {
                remove(&mut caches.relationships, "relationship", d);
            },
            dispatch::USER_UPDATE => {
                if let Value::Object(patch) = d {
                    match caches.current_user.as_mut() {
                        Some(user) => merge_records(user, patch, caches.users.strategy()),
                        None => caches.current_user = Some(patch.clone()),
                    }
                }
                upsert(&mut caches.users, "user", d);
            },
            _ => {},
        }
    }

    fn load_ready(&self, d: &Value) {
        info!("READY received, caching initial state");
        let mut guard = self.caches.write().unwrap_or_else(|e| e.into_inner());
        let caches = &mut *guard;

        let guilds = load_all(&mut caches.guilds, "guild", d.get("guilds"));
        let channels = load_all(
            &mut caches.private_channels,
            "channel",
            d.get("private_channels"),
        );
        let relationships = load_all(&mut caches.relationships, "relationship", d.get("relationships"));
        let users = load_all(&mut caches.users, "user", d.get("users"));

        caches.current_user = d.get("user").and_then(Value::as_object).cloned();
        if let Some(user) = d.get("user") {
            upsert(&mut caches.users, "user", user);
        }

        info!(
            guilds,
            private_channels = channels,
            relationships,
            users,
            has_user = caches.current_user.is_some(),
            "initial state cached"
        );
    }
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("ready", &self.ready.is_open())
            .finish_non_exhaustive()
    }
}

fn is_private(d: &Value) -> bool {
    d.get("guild_id").is_none_or(Value::is_null)
}

fn key_of(kind: &str, item: &Value) -> Option<CacheKey> {
    let key = item.get("id").and_then(CacheKey::from_value);
    if key.is_none() {
        warn!(kind, "skipping {kind} without an id");
    }
    key
}

fn upsert(cache: &mut ObjectCache, kind: &str, item: &Value) -> bool {
    let Some(key) = key_of(kind, item) else {
        return false;
    };
    match cache.update(key, item) {
        Ok(_) => true,
        Err(e) => {
            warn!(kind, error = %e, "skipping {kind}");
            false
        },
    }
}

fn remove(cache: &mut ObjectCache, kind: &str, item: &Value) {
    if let Some(key) = key_of(kind, item) {
        let removed = cache.delete(key.clone());
        debug!(kind, %key, removed, "cache entry deleted");
    }
}

/// Upsert every element of a JSON array; returns how many were stored.
fn load_all(cache: &mut ObjectCache, kind: &str, items: Option<&Value>) -> usize {
    let Some(items) = items.and_then(Value::as_array) else {
        return 0;
    };
    items
        .iter()
        .filter(|item| upsert(cache, kind, item))
        .count()
}
