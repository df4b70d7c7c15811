//! Holds members, PEL, and a `start_at` cursor behind one
//! `parking_lot::RwLock`. A value-copy of a group would duplicate the lock,
//! so this type is never `Clone`; it is always handled through
//! `Arc<ConsumerGroup>`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::config::ConsumerGroupOptions;
use crate::consumer::Consumer;
use crate::entry_id::EntryID;
use crate::pel::{PendingEntriesList, PendingEntry};

#[derive(Debug)]
struct Inner {
    members: HashMap<String, Consumer>,
    pel: PendingEntriesList,
    start_at: EntryID,
}

#[derive(Debug)]
pub struct ConsumerGroup {
    pub name: String,
    inner: RwLock<Inner>,
}

impl ConsumerGroup {
    pub fn new(options: ConsumerGroupOptions) -> Self {
        Self {
            name: options.name,
            inner: RwLock::new(Inner {
                members: options.members,
                pel: PendingEntriesList::new(),
                start_at: options.start_at,
            }),
        }
    }

    pub fn start_at(&self) -> EntryID {
        self.inner.read().start_at
    }

    pub fn set_start_at(&self, id: EntryID) {
        self.inner.write().start_at = id;
    }

    pub fn add_member(&self, member: Consumer) {
        self.inner.write().members.insert(member.name.clone(), member);
    }

    pub fn remove_member(&self, name: &str) {
        self.inner.write().members.remove(name);
    }

    pub fn list_members(&self) -> Vec<Consumer> {
        self.inner.read().members.values().cloned().collect()
    }

    pub fn get_member(&self, name: &str) -> Option<Consumer> {
        self.inner.read().members.get(name).cloned()
    }

    pub fn get_pending_entry(&self, id: EntryID) -> Option<PendingEntry> {
        self.inner.read().pel.get(id).cloned()
    }

    pub fn get_pending_entries_for_consumer(&self, consumer: &str) -> Vec<PendingEntry> {
        self.inner.read().pel.for_consumer(consumer)
    }

    /// Inserts at `delivery_count = 1` if absent, otherwise increments the
    /// count and refreshes `delivered_at`.
    pub fn add_pending_entry(&self, id: EntryID, consumer: &str, now: DateTime<Utc>) -> PendingEntry {
        self.inner.write().pel.upsert(id, consumer, now)
    }

    pub fn remove_pending_entry(&self, id: EntryID) -> Option<PendingEntry> {
        self.inner.write().pel.remove(id)
    }

    /// A deep-copied snapshot of every pending entry in the group.
    pub fn list_pending_entries(&self) -> Vec<PendingEntry> {
        self.inner.read().pel.list_all()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.read().pel.len()
    }

    /// JSON form of the PEL: an object keyed by the entry's canonical
    /// string, valued by `{consumer, delivered_at, delivery_count}`.
    pub fn pending_entries_json(&self) -> serde_json::Value {
        let inner = self.inner.read();
        let mut map = serde_json::Map::new();
        for entry in inner.pel.iter() {
            map.insert(
                entry.id.to_string(),
                serde_json::json!({
                    "consumer": entry.consumer,
                    "delivered_at": entry.delivered_at.to_rfc3339(),
                    "delivery_count": entry.delivery_count,
                }),
            );
        }
        serde_json::Value::Object(map)
    }

    /// Evicts every pending entry matching `should_evict`, used by
    /// `Log::cleanup` under the group's own exclusive lock. Returns the
    /// number of entries evicted.
    pub(crate) fn evict_where(&self, mut should_evict: impl FnMut(&PendingEntry) -> bool) -> usize {
        let mut inner = self.inner.write();
        let to_evict: Vec<EntryID> = inner
            .pel
            .iter()
            .filter(|e| should_evict(e))
            .map(|e| e.id)
            .collect();
        for id in &to_evict {
            inner.pel.remove(*id);
        }
        to_evict.len()
    }
}
