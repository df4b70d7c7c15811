//! Per-group mapping `EntryID -> PendingEntry`. At most one entry per id.
//! Snapshots handed to callers are deep copies, independent of the live map,
//! so external readers cannot corrupt internal state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry_id::EntryID;

/// A single in-flight delivery record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub id: EntryID,
    pub consumer: String,
    pub delivered_at: DateTime<Utc>,
    pub delivery_count: u64,
}

/// Per-group map of in-flight entries awaiting acknowledgment.
#[derive(Debug, Clone, Default)]
pub struct PendingEntriesList {
    entries: BTreeMap<EntryID, PendingEntry>,
}

impl PendingEntriesList {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, id: EntryID) -> Option<&PendingEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: EntryID) -> bool {
        self.entries.contains_key(&id)
    }

    /// If absent, inserts with `delivery_count = 1` and `delivered_at = now`;
    /// if present, increments `delivery_count` and refreshes `delivered_at`.
    pub fn upsert(&mut self, id: EntryID, consumer: &str, now: DateTime<Utc>) -> PendingEntry {
        let entry = self
            .entries
            .entry(id)
            .and_modify(|e| {
                e.consumer = consumer.to_string();
                e.delivery_count += 1;
                e.delivered_at = now;
            })
            .or_insert_with(|| PendingEntry {
                id,
                consumer: consumer.to_string(),
                delivered_at: now,
                delivery_count: 1,
            });
        entry.clone()
    }

    pub fn remove(&mut self, id: EntryID) -> Option<PendingEntry> {
        self.entries.remove(&id)
    }

    /// All entries currently owned by `consumer`, in `EntryID` order.
    pub fn for_consumer(&self, consumer: &str) -> Vec<PendingEntry> {
        self.entries
            .values()
            .filter(|e| e.consumer == consumer)
            .cloned()
            .collect()
    }

    /// A deep-copied snapshot of every pending entry.
    pub fn list_all(&self) -> Vec<PendingEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEntry> {
        self.entries.values()
    }
}
