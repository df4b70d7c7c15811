//! Options for `Log`, `ConsumerGroup`, and `Consumer`.
//!
//! Loading these from a file or environment is a host concern, not this
//! crate's; a caller is expected to hand `Log::new`/`ConsumerGroup::new` a
//! fully resolved options value.

use std::collections::HashMap;
use std::time::Duration;

use crate::consumer::Consumer;
use crate::entry_id::EntryID;

/// Options governing a [`crate::log::Log`].
#[derive(Debug, Clone)]
pub struct LogOptions {
    pub name: String,
    /// Dead-consumer escape hatch: a pending entry idle longer than this is
    /// evicted by `Cleanup` unconditionally. Default 4s.
    pub max_pending_age: Duration,
    /// A pending entry is only eligible for redelivery while its delivery
    /// count is strictly below this value. Default 3.
    pub max_delivery_count: u64,
    /// Minimum idle time before a pending entry becomes eligible for
    /// redelivery on a `Read`. Default 1s.
    pub attempt_redelivery_after: Duration,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_pending_age: Duration::from_secs(4),
            max_delivery_count: 3,
            attempt_redelivery_after: Duration::from_secs(1),
        }
    }
}

impl LogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_pending_age(mut self, d: Duration) -> Self {
        self.max_pending_age = d;
        self
    }

    pub fn with_max_delivery_count(mut self, n: u64) -> Self {
        self.max_delivery_count = n;
        self
    }

    pub fn with_attempt_redelivery_after(mut self, d: Duration) -> Self {
        self.attempt_redelivery_after = d;
        self
    }
}

/// Options governing a [`crate::consumer_group::ConsumerGroup`].
#[derive(Debug, Clone)]
pub struct ConsumerGroupOptions {
    pub name: String,
    pub start_at: EntryID,
    pub members: HashMap<String, Consumer>,
}

impl Default for ConsumerGroupOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            start_at: EntryID::START_FROM_BEGINNING,
            // Every ConsumerGroupOptions owns a freshly allocated map, so no
            // two group instances ever share a default members map.
            members: HashMap::new(),
        }
    }
}

impl ConsumerGroupOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_start_at(mut self, start_at: EntryID) -> Self {
        self.start_at = start_at;
        self
    }

    pub fn with_member(mut self, member: Consumer) -> Self {
        self.members.insert(member.name.clone(), member);
        self
    }
}

/// Options governing a [`Consumer`].
#[derive(Debug, Clone, Default)]
pub struct ConsumerOptions {
    pub name: String,
}

impl ConsumerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn build(self) -> Consumer {
        Consumer::new(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_options_defaults() {
        let opts = LogOptions::default();
        assert_eq!(opts.max_pending_age, Duration::from_secs(4));
        assert_eq!(opts.max_delivery_count, 3);
        assert_eq!(opts.attempt_redelivery_after, Duration::from_secs(1));
    }

    #[test]
    fn consumer_group_options_default_to_distinct_members_maps() {
        let a = ConsumerGroupOptions::default();
        let mut b = ConsumerGroupOptions::default();
        b.members.insert("x".into(), Consumer::new("x"));
        assert!(a.members.is_empty());
        assert_eq!(b.members.len(), 1);
    }

    #[test]
    fn consumer_group_options_default_start_at_is_beginning() {
        assert_eq!(
            ConsumerGroupOptions::default().start_at,
            EntryID::START_FROM_BEGINNING
        );
    }
}
