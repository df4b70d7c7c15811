//! `EntryID`: a totally ordered identifier, `(timestamp_ms, seq)`. Canonical
//! string form is `"<timestamp_ms>-<seq zero-padded to 13 digits>"`; the
//! padding makes lexicographic string order equal tuple order.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ChronicleError;

/// Sequence reserved for the "start from the beginning of the log" cursor.
pub const SEQ_START_FROM_BEGINNING: u64 = 128;
/// Sequence reserved for the "start from the end of the log" cursor.
pub const SEQ_START_FROM_END: u64 = 129;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EntryID {
    pub timestamp_ms: i64,
    pub seq: u64,
}

impl EntryID {
    /// Sentinel cursor meaning "everything ever written to the log".
    pub const START_FROM_BEGINNING: EntryID = EntryID {
        timestamp_ms: 0,
        seq: SEQ_START_FROM_BEGINNING,
    };
    /// Sentinel cursor meaning "only entries written after this group is created".
    pub const START_FROM_END: EntryID = EntryID {
        timestamp_ms: 0,
        seq: SEQ_START_FROM_END,
    };

    pub const fn new(timestamp_ms: i64, seq: u64) -> Self {
        Self { timestamp_ms, seq }
    }

    /// Current instant, truncated to millisecond resolution and UTC.
    pub fn now(seq: u64) -> Self {
        Self {
            timestamp_ms: Utc::now().timestamp_millis(),
            seq,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.timestamp_ms == 0 && self.seq == 0
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::START_FROM_BEGINNING || *self == Self::START_FROM_END
    }

    /// Canonical string form, always 13-digit zero-padded sequence.
    pub fn to_canonical_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EntryID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:013}", self.timestamp_ms, self.seq)
    }
}

impl FromStr for EntryID {
    type Err = ChronicleError;

    // Accepts any digit width for the sequence; canonical writers always
    // emit 13 digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ts_part, seq_part) = s
            .split_once('-')
            .ok_or_else(|| ChronicleError::MalformedEntryID(s.to_string()))?;

        let timestamp_ms: i64 = ts_part
            .parse()
            .map_err(|_| ChronicleError::MalformedEntryID(s.to_string()))?;
        let seq: u64 = seq_part
            .parse()
            .map_err(|_| ChronicleError::MalformedEntryID(s.to_string()))?;

        Ok(Self { timestamp_ms, seq })
    }
}

impl EntryID {
    pub fn parse(s: &str) -> Result<Self, ChronicleError> {
        s.parse()
    }
}
