// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Query cache: latest known value per [`QueryKey`] plus its listeners.
//!
//! The cache does not distinguish speculative from authoritative writes; that
//! policy lives in the patch engine and the reconciler. Every write goes
//! through [`QueryCache::set`], which bumps the key's [`WriteStamp`] and
//! notifies listeners synchronously, in call order.
//!
//! # Slot Lifecycle
//!
//! - The first [`subscribe`](QueryCache::subscribe) for a key creates its slot
//!   (entry [`CacheEntry::Unknown`]) and queues [`Lifecycle::Opened`].
//! - The last [`unsubscribe`](QueryCache::unsubscribe) removes the slot and
//!   queues [`Lifecycle::Closed`].
//! - Writes to keys without a slot are dropped.

use optimist_proto::{QueryKey, Value};
use std::collections::HashMap;
use tracing::debug;

/// Current value held for a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CacheEntry {
    /// No data received yet (renders as loading).
    #[default]
    Unknown,
    /// A concrete result: list of records, single record or scalar.
    Ready(Value),
    /// The backend reported the query itself as failing.
    Failed(String),
}

impl CacheEntry {
    /// Borrow the value of a [`CacheEntry::Ready`] entry.
    pub fn value(&self) -> Option<&Value> {
        match self {
            CacheEntry::Ready(v) => Some(v),
            _ => None,
        }
    }

    /// Returns `true` while no data has been received.
    pub fn is_unknown(&self) -> bool {
        matches!(self, CacheEntry::Unknown)
    }
}

impl From<Value> for CacheEntry {
    fn from(value: Value) -> Self {
        CacheEntry::Ready(value)
    }
}

/// Monotonic per-cache write counter, recorded on every slot write.
///
/// Stamps are unique across the whole cache, so comparing a key's current
/// stamp with a remembered one answers "has anything written here since?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WriteStamp(pub u64);

/// Callback fired after every write to a subscribed key.
pub type Listener = Box<dyn FnMut(&QueryKey, &CacheEntry)>;

/// Handle returned by [`QueryCache::subscribe`]; hand it back to
/// [`QueryCache::unsubscribe`] to detach the listener.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping a Subscription leaks the listener; pass it to unsubscribe"]
pub struct Subscription {
    key: QueryKey,
    id: u64,
}

impl Subscription {
    /// Key this subscription listens to.
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

/// Backend subscription transitions produced by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    /// First listener attached; the backend subscription should start.
    Opened(QueryKey),
    /// Last listener detached; the backend subscription should stop.
    Closed(QueryKey),
}

struct Slot {
    entry: CacheEntry,
    stamp: WriteStamp,
    listeners: Vec<(u64, Listener)>,
}

static UNKNOWN: CacheEntry = CacheEntry::Unknown;

/// Registry of query results keyed by [`QueryKey`].
///
/// Constructed explicitly and owned by its client; nothing here is global.
#[derive(Default)]
pub struct QueryCache {
    slots: HashMap<QueryKey, Slot>,
    last_stamp: u64,
    next_listener: u64,
    outbox: Vec<Lifecycle>,
}

impl QueryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> WriteStamp {
        self.last_stamp += 1;
        WriteStamp(self.last_stamp)
    }

    /// Current entry for `key`; [`CacheEntry::Unknown`] when nothing is known.
    pub fn get(&self, key: &QueryKey) -> &CacheEntry {
        match self.slots.get(key) {
            Some(slot) => &slot.entry,
            None => {
                debug!(key = %key, "read of unsubscribed query");
                &UNKNOWN
            }
        }
    }

    /// Stamp of the last write to `key`, or `None` if nobody subscribes to it.
    pub fn stamp_of(&self, key: &QueryKey) -> Option<WriteStamp> {
        self.slots.get(key).map(|slot| slot.stamp)
    }

    /// Overwrite the entry for `key` and notify its listeners.
    ///
    /// Returns the new stamp, or `None` when the key has no subscribers (the
    /// write is dropped).
    pub fn set(&mut self, key: &QueryKey, entry: impl Into<CacheEntry>) -> Option<WriteStamp> {
        if !self.slots.contains_key(key) {
            debug!(key = %key, "dropping write to unsubscribed query");
            return None;
        }
        let stamp = self.bump();
        let slot = self.slots.get_mut(key)?;
        slot.entry = entry.into();
        slot.stamp = stamp;
        debug!(key = %key, stamp = stamp.0, listeners = slot.listeners.len(), "cache write");
        let Slot {
            entry, listeners, ..
        } = slot;
        for (_, listener) in listeners.iter_mut() {
            listener(key, entry);
        }
        Some(stamp)
    }

    /// Attach `listener` to `key`. The first listener for a key creates its
    /// slot and queues [`Lifecycle::Opened`].
    pub fn subscribe<F>(&mut self, key: QueryKey, listener: F) -> Subscription
    where
        F: FnMut(&QueryKey, &CacheEntry) + 'static,
    {
        let id = self.next_listener;
        self.next_listener += 1;
        if !self.slots.contains_key(&key) {
            let stamp = self.bump();
            self.slots.insert(
                key.clone(),
                Slot {
                    entry: CacheEntry::Unknown,
                    stamp,
                    listeners: Vec::new(),
                },
            );
            debug!(key = %key, "query opened");
            self.outbox.push(Lifecycle::Opened(key.clone()));
        }
        if let Some(slot) = self.slots.get_mut(&key) {
            slot.listeners.push((id, Box::new(listener)));
        }
        Subscription { key, id }
    }

    /// Detach a listener. Removing the last listener drops the slot and
    /// queues [`Lifecycle::Closed`]. Returns `false` for stale handles.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let Some(slot) = self.slots.get_mut(&subscription.key) else {
            return false;
        };
        let before = slot.listeners.len();
        slot.listeners.retain(|(id, _)| *id != subscription.id);
        if slot.listeners.len() == before {
            return false;
        }
        if slot.listeners.is_empty() {
            self.slots.remove(&subscription.key);
            debug!(key = %subscription.key, "query closed");
            self.outbox.push(Lifecycle::Closed(subscription.key));
        }
        true
    }

    /// Take queued lifecycle transitions, oldest first.
    pub fn drain_lifecycle(&mut self) -> Vec<Lifecycle> {
        std::mem::take(&mut self.outbox)
    }

    /// Returns `true` if `key` has at least one listener.
    pub fn is_subscribed(&self, key: &QueryKey) -> bool {
        self.slots.contains_key(key)
    }

    /// Number of listeners attached to `key`.
    pub fn listener_count(&self, key: &QueryKey) -> usize {
        self.slots.get(key).map_or(0, |slot| slot.listeners.len())
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no query is subscribed.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Keys with live slots (unordered).
    pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.slots.keys()
    }
}
