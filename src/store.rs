//! Ordered, string-keyed entry store. Any ordered associative container
//! satisfies the contract the log needs; this one is a `BTreeMap` keyed by
//! the `EntryID`'s canonical string form.

use std::collections::BTreeMap;

use crate::entry_id::EntryID;

/// Ordered key -> payload map. Keys are always non-sentinel `EntryID`s.
#[derive(Debug, Clone, Default)]
pub struct EntryStore<P> {
    entries: BTreeMap<String, (EntryID, P)>,
}

impl<P> EntryStore<P> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Inserts `payload` at `id`. Returns the previous payload (if any) and
    /// whether the key already existed.
    pub fn insert(&mut self, id: EntryID, payload: P) -> (Option<P>, bool) {
        match self.entries.insert(id.to_canonical_string(), (id, payload)) {
            Some((_, prev)) => (Some(prev), true),
            None => (None, false),
        }
    }

    pub fn search(&self, id: EntryID) -> Option<&P> {
        self.entries.get(&id.to_canonical_string()).map(|(_, p)| p)
    }

    pub fn delete(&mut self, id: EntryID) -> Option<P> {
        self.entries
            .remove(&id.to_canonical_string())
            .map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ascending iteration in key order.
    pub fn iter(&self) -> impl Iterator<Item = (EntryID, &P)> {
        self.entries.values().map(|(id, p)| (*id, p))
    }

    /// Iterates starting strictly after `pivot` (exclusive). `None` behaves
    /// as `iter()`. If `pivot` is never observed in key order, the iterator
    /// is empty.
    pub fn iter_from(&self, pivot: Option<EntryID>) -> IterFrom<'_, P> {
        match pivot {
            None => IterFrom {
                inner: self.entries.values(),
                state: IterFromState::Passthrough,
            },
            Some(id) => IterFrom {
                inner: self.entries.values(),
                state: IterFromState::AwaitingPivot(id.to_canonical_string()),
            },
        }
    }
}

enum IterFromState {
    Passthrough,
    AwaitingPivot(String),
    PastPivot,
    Exhausted,
}

pub struct IterFrom<'a, P> {
    inner: std::collections::btree_map::Values<'a, String, (EntryID, P)>,
    state: IterFromState,
}

impl<'a, P> Iterator for IterFrom<'a, P> {
    type Item = (EntryID, &'a P);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &self.state {
                IterFromState::Passthrough => {
                    let (id, p) = self.inner.next()?;
                    return Some((*id, p));
                }
                IterFromState::PastPivot => {
                    let (id, p) = self.inner.next()?;
                    return Some((*id, p));
                }
                IterFromState::Exhausted => return None,
                IterFromState::AwaitingPivot(pivot) => {
                    let pivot = pivot.clone();
                    loop {
                        match self.inner.next() {
                            None => {
                                self.state = IterFromState::Exhausted;
                                return None;
                            }
                            Some((key, (id, p))) => {
                                if *key == pivot {
                                    self.state = IterFromState::PastPivot;
                                    break;
                                }
                                let _ = (id, p);
                            }
                        }
                    }
                }
            }
        }
    }
}
