//! The top-level coordinator. Owns the entry store and the group registry;
//! implements write, read, acknowledge, update, and cleanup.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::codec::{
    Decode, Encode, SNAPSHOT_MAGIC, finalize_with_checksum, read_string, read_varint,
    verify_checksum, write_string, write_varint,
};
use crate::config::{ConsumerGroupOptions, LogOptions};
use crate::consumer::Consumer;
use crate::consumer_group::ConsumerGroup;
use crate::entry_id::EntryID;
use crate::error::{ChronicleError, Result};
use crate::pel::PendingEntry;
use crate::store::EntryStore;

/// A single `(id, payload)` pair returned from `Log::read`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<P> {
    pub id: EntryID,
    pub payload: P,
}

struct Inner<P> {
    entries: EntryStore<P>,
    groups: HashMap<String, Arc<ConsumerGroup>>,
    first_entry: Option<EntryID>,
    last_entry: EntryID,
}

/// The log engine. Owns its store and its group registry exclusively; a
/// `ConsumerGroup` exclusively owns its own PEL and member set.
pub struct Log<P> {
    pub name: String,
    pub max_pending_age: std::time::Duration,
    pub max_delivery_count: u64,
    pub attempt_redelivery_after: std::time::Duration,
    inner: RwLock<Inner<P>>,
}

impl<P: Clone> Log<P> {
    pub fn new(options: LogOptions) -> Self {
        Self {
            name: options.name,
            max_pending_age: options.max_pending_age,
            max_delivery_count: options.max_delivery_count,
            attempt_redelivery_after: options.attempt_redelivery_after,
            inner: RwLock::new(Inner {
                entries: EntryStore::new(),
                groups: HashMap::new(),
                first_entry: None,
                last_entry: EntryID::default(),
            }),
        }
    }

    /// Appends `payload`, returning its assigned `EntryID`. Under the
    /// exclusive lock: form an id at `(now_ms, 0)`; on collision, restore
    /// the overwritten value and retry with an incremented sequence until
    /// the insert succeeds without replacing anything.
    pub fn write(&self, payload: P) -> EntryID {
        let mut inner = self.inner.write();
        let mut id = EntryID::now(0);
        loop {
            let (previous, replaced) = inner.entries.insert(id, payload.clone());
            if !replaced {
                break;
            }
            // Restore what we just overwrote, then retry with seq + 1.
            if let Some(previous) = previous {
                inner.entries.insert(id, previous);
            }
            id.seq += 1;
        }
        inner.last_entry = id;
        if inner.first_entry.is_none() {
            inner.first_entry = Some(id);
        }
        debug!(id = %id, "wrote entry");
        id
    }

    /// Reads up to `max` entries for `consumer` in `group`: pending entries
    /// due for redelivery first, then fresh entries walked forward from the
    /// group's `start_at` cursor.
    pub fn read(&self, group: &str, consumer: &str, max: usize) -> Result<Vec<Entry<P>>> {
        let inner = self.inner.read();
        let group = inner
            .groups
            .get(group)
            .ok_or_else(|| ChronicleError::NoSuchGroup(group.to_string()))?;
        if group.get_member(consumer).is_none() {
            return Err(ChronicleError::NoSuchConsumer {
                group: group.name.clone(),
                consumer: consumer.to_string(),
            });
        }

        let mut out = Vec::new();
        let now = Utc::now();

        // --- Redelivery phase ---
        for pending in group.get_pending_entries_for_consumer(consumer) {
            if max > 0 && out.len() >= max {
                break;
            }
            let idle = now.signed_duration_since(pending.delivered_at);
            let idle = idle.to_std().unwrap_or_default();
            if idle > self.attempt_redelivery_after && pending.delivery_count < self.max_delivery_count
            {
                group.add_pending_entry(pending.id, consumer, now);
                let payload = inner
                    .entries
                    .search(pending.id)
                    .ok_or(ChronicleError::NoSuchEntry(pending.id))?
                    .clone();
                out.push(Entry {
                    id: pending.id,
                    payload,
                });
            }
        }
        debug!(group = %group.name, consumer, redelivered = out.len(), "redelivery phase complete");

        if max > 0 && out.len() >= max {
            return Ok(out);
        }

        // --- Fresh phase ---
        let start_at = group.start_at();
        let pivot = if start_at == EntryID::START_FROM_BEGINNING {
            None
        } else {
            Some(start_at)
        };

        let mut last_delivered = None;
        let mut reached_end = true;
        for (id, payload) in inner.entries.iter_from(pivot) {
            if max > 0 && out.len() >= max {
                reached_end = false;
                break;
            }
            if group.get_pending_entry(id).is_some() {
                // Already in flight with some consumer.
                continue;
            }
            group.add_pending_entry(id, consumer, now);
            out.push(Entry {
                id,
                payload: payload.clone(),
            });
            last_delivered = Some(id);
        }

        if let Some(last) = last_delivered {
            // Advance to the last id actually delivered, not to the tail of
            // the scan; if the cap stopped the scan early the cursor still
            // only moves as far as this call handed out.
            let _ = reached_end;
            group.set_start_at(last);
        }
        debug!(group = %group.name, consumer, fresh = out.len(), "fresh phase complete");

        Ok(out)
    }

    /// Removes `id` from `group`'s PEL on behalf of `consumer`. The entry
    /// remains in the store.
    pub fn acknowledge(&self, group: &str, consumer: &str, id: EntryID) -> Result<()> {
        let inner = self.inner.read();
        let group = inner
            .groups
            .get(group)
            .ok_or_else(|| ChronicleError::NoSuchGroup(group.to_string()))?;

        let pending = group
            .get_pending_entry(id)
            .ok_or(ChronicleError::NotPending(id))?;
        if pending.consumer != consumer {
            warn!(id = %id, expected = %pending.consumer, got = consumer, "cross-consumer ack rejected");
            return Err(ChronicleError::NoSuchConsumer {
                group: group.name.clone(),
                consumer: consumer.to_string(),
            });
        }
        group.remove_pending_entry(id);
        debug!(id = %id, group = %group.name, consumer, "acknowledged");
        Ok(())
    }

    /// Updates the payload at `id` in place. A no-op (returns `false`) when
    /// `id` is unknown, implemented by inserting then compensating, with
    /// the exclusive lock held for the whole call so no reader can observe
    /// the speculative insert before the compensating delete.
    pub fn update_entry(&self, id: EntryID, payload: P) -> bool {
        let mut inner = self.inner.write();
        let (_, replaced) = inner.entries.insert(id, payload);
        if !replaced {
            inner.entries.delete(id);
            return false;
        }
        true
    }

    /// Point lookup under the shared lock.
    pub fn search(&self, id: EntryID) -> Option<P> {
        self.inner.read().entries.search(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    pub fn first_entry(&self) -> Option<EntryID> {
        self.inner.read().first_entry
    }

    pub fn last_entry(&self) -> EntryID {
        self.inner.read().last_entry
    }

    pub fn add_group(&self, options: ConsumerGroupOptions) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.groups.contains_key(&options.name) {
            return Err(ChronicleError::GroupExists(options.name));
        }
        let name = options.name.clone();
        inner.groups.insert(name, Arc::new(ConsumerGroup::new(options)));
        Ok(())
    }

    pub fn remove_group(&self, name: &str) -> bool {
        self.inner.write().groups.remove(name).is_some()
    }

    pub fn list_groups(&self) -> Vec<String> {
        self.inner.read().groups.keys().cloned().collect()
    }

    pub fn group(&self, name: &str) -> Option<Arc<ConsumerGroup>> {
        self.inner.read().groups.get(name).cloned()
    }

    /// Housekeeping pass over every group's PEL. For each entry: evict if
    /// idle past `attempt_redelivery_after` and delivery count has exceeded
    /// `max_delivery_count`, or if idle past `max_pending_age` regardless of
    /// count. An entry at exactly `max_delivery_count` is neither redelivered
    /// (redelivery requires strictly less than) nor evicted by the count
    /// branch (which requires strictly greater than) until `max_pending_age`
    /// elapses; that gap is intentional, not a bug.
    ///
    /// Takes the exclusive lock: running concurrently with a `Read` could
    /// otherwise let a pending entry get evicted here and resurrected there,
    /// with `Read`'s `add_pending_entry` resetting the delivery count an
    /// instant after `Cleanup` decided to retire it.
    pub fn cleanup(&self) {
        let inner = self.inner.write();
        let now = Utc::now();
        for group in inner.groups.values() {
            let max_delivery_count = self.max_delivery_count;
            let max_pending_age = self.max_pending_age;
            let attempt_redelivery_after = self.attempt_redelivery_after;
            let evicted = group.evict_where(|entry: &PendingEntry| {
                let idle = now
                    .signed_duration_since(entry.delivered_at)
                    .to_std()
                    .unwrap_or_default();
                (idle > attempt_redelivery_after && entry.delivery_count > max_delivery_count)
                    || idle > max_pending_age
            });
            if evicted > 0 {
                info!(group = %group.name, evicted, "cleanup evicted pending entries");
            }
        }
    }
}

impl<P: Clone + Encode> Log<P> {
    /// Encodes the whole log (entries, groups, options) into the binary
    /// snapshot format, terminated by a CRC-64 checksum.
    pub fn encode(&self) -> Bytes {
        let inner = self.inner.read();
        let mut buf = BytesMut::new();
        buf.put_slice(SNAPSHOT_MAGIC);
        write_string(&mut buf, &self.name);

        write_varint(&mut buf, inner.entries.len() as u64);
        for (id, payload) in inner.entries.iter() {
            buf.put_i64(id.timestamp_ms);
            buf.put_u64(id.seq);
            payload.encode(&mut buf);
        }

        buf.put_i64(inner.first_entry.unwrap_or_default().timestamp_ms);
        buf.put_u64(inner.first_entry.unwrap_or_default().seq);
        buf.put_i64(inner.last_entry.timestamp_ms);
        buf.put_u64(inner.last_entry.seq);

        buf.put_u64(self.max_pending_age.as_millis() as u64);
        buf.put_u64(self.max_delivery_count);
        buf.put_u64(self.attempt_redelivery_after.as_millis() as u64);

        write_varint(&mut buf, inner.groups.len() as u64);
        for group in inner.groups.values() {
            encode_group(&mut buf, group);
        }

        finalize_with_checksum(&mut buf)
    }

    /// Writes the snapshot to `writer`.
    pub fn save_to_writer(&self, writer: &mut impl std::io::Write) -> Result<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }
}

impl<P: Clone + Decode> Log<P> {
    /// Decodes a previously encoded snapshot. Rebuilds the store by
    /// inserting entries in serialized order.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let body = verify_checksum(data)?;
        let mut buf = body;

        if buf.remaining() < SNAPSHOT_MAGIC.len() || &buf[..SNAPSHOT_MAGIC.len()] != SNAPSHOT_MAGIC {
            return Err(ChronicleError::Corrupt("bad magic".to_string()));
        }
        buf.advance(SNAPSHOT_MAGIC.len());

        let name = read_string(&mut buf)?;

        let entry_count = read_varint(&mut buf)?;
        let mut entries = EntryStore::new();
        for _ in 0..entry_count {
            require(&buf, 16)?;
            let timestamp_ms = buf.get_i64();
            let seq = buf.get_u64();
            let id = EntryID::new(timestamp_ms, seq);
            let payload = P::decode(&mut buf)?;
            entries.insert(id, payload);
        }

        require(&buf, 16)?;
        let first_ts = buf.get_i64();
        let first_seq = buf.get_u64();
        let first_entry = if first_ts == 0 && first_seq == 0 && entries.is_empty() {
            None
        } else {
            Some(EntryID::new(first_ts, first_seq))
        };

        require(&buf, 16)?;
        let last_entry = EntryID::new(buf.get_i64(), buf.get_u64());

        require(&buf, 24)?;
        let max_pending_age = std::time::Duration::from_millis(buf.get_u64());
        let max_delivery_count = buf.get_u64();
        let attempt_redelivery_after = std::time::Duration::from_millis(buf.get_u64());

        let group_count = read_varint(&mut buf)?;
        let mut groups = HashMap::new();
        for _ in 0..group_count {
            let (name, group) = decode_group(&mut buf)?;
            groups.insert(name, Arc::new(group));
        }

        Ok(Self {
            name,
            max_pending_age,
            max_delivery_count,
            attempt_redelivery_after,
            inner: RwLock::new(Inner {
                entries,
                groups,
                first_entry,
                last_entry,
            }),
        })
    }

    /// Reads a snapshot back from `reader`, the inverse of
    /// [`Log::save_to_writer`].
    pub fn load_from_reader(reader: &mut impl std::io::Read) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::decode(&data)
    }
}

/// Guards a fixed-width read inside a counted loop (entries, groups,
/// pending entries). Running out of bytes mid-record means the declared
/// count promised more records than the buffer actually holds.
fn require(buf: &Bytes, n: usize) -> Result<()> {
    if buf.remaining() < n {
        return Err(ChronicleError::NoMoreEntries);
    }
    Ok(())
}

fn encode_group(buf: &mut BytesMut, group: &ConsumerGroup) {
    write_string(buf, &group.name);
    let start_at = group.start_at();
    buf.put_i64(start_at.timestamp_ms);
    buf.put_u64(start_at.seq);

    let members = group.list_members();
    write_varint(buf, members.len() as u64);
    for m in &members {
        write_string(buf, &m.name);
    }

    let pending = group.list_pending_entries();
    write_varint(buf, pending.len() as u64);
    for p in &pending {
        buf.put_i64(p.id.timestamp_ms);
        buf.put_u64(p.id.seq);
        write_string(buf, &p.consumer);
        buf.put_i64(p.delivered_at.timestamp_millis());
        buf.put_u64(p.delivery_count);
    }
}

fn decode_group(buf: &mut Bytes) -> Result<(String, ConsumerGroup)> {
    let name = read_string(buf)?;
    require(buf, 16)?;
    let start_at = EntryID::new(buf.get_i64(), buf.get_u64());

    let member_count = read_varint(buf)?;
    let mut options = ConsumerGroupOptions::new()
        .with_name(name.clone())
        .with_start_at(start_at);
    for _ in 0..member_count {
        let member_name = read_string(buf)?;
        options = options.with_member(Consumer::new(member_name));
    }

    let group = ConsumerGroup::new(options);

    let pending_count = read_varint(buf)?;
    for _ in 0..pending_count {
        require(buf, 16)?;
        let id = EntryID::new(buf.get_i64(), buf.get_u64());
        let consumer = read_string(buf)?;
        require(buf, 16)?;
        let delivered_at_ms = buf.get_i64();
        let delivery_count = buf.get_u64();
        let delivered_at = chrono::DateTime::from_timestamp_millis(delivered_at_ms)
            .ok_or_else(|| ChronicleError::Corrupt("invalid timestamp".to_string()))?;
        // Replay the exact delivery count rather than re-deriving it through
        // repeated upserts, since a snapshot may have been taken mid-redelivery.
        let mut current = group.add_pending_entry(id, &consumer, delivered_at);
        while current.delivery_count < delivery_count {
            current = group.add_pending_entry(id, &consumer, delivered_at);
        }
    }

    Ok((name, group))
}
