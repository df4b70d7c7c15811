//! Defines the primary error type for the crate.

use std::sync::Arc;
use thiserror::Error;

use crate::entry_id::EntryID;

/// All failures the log engine can surface to a caller: one variant per
/// distinct failure mode, with `thiserror` deriving `Display`. The engine
/// never panics on its own invariants; every failure path returns one of
/// these instead.
#[derive(Error, Debug, Clone)]
pub enum ChronicleError {
    #[error("no such consumer group '{0}'")]
    NoSuchGroup(String),

    #[error("no such consumer '{consumer}' in group '{group}'")]
    NoSuchConsumer { group: String, consumer: String },

    #[error("entry {0} is not pending")]
    NotPending(EntryID),

    #[error("entry {0} referenced by the PEL is missing from the store")]
    NoSuchEntry(EntryID),

    #[error("iterator exhausted")]
    NoMoreEntries,

    #[error("malformed entry id '{0}'")]
    MalformedEntryID(String),

    #[error("declared length {0} is invalid")]
    InvalidLength(usize),

    #[error("snapshot checksum mismatch")]
    ChecksumMismatch,

    #[error("corrupt snapshot: {0}")]
    Corrupt(String),

    #[error("consumer group '{0}' already exists")]
    GroupExists(String),

    #[error("io error: {0}")]
    Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for ChronicleError {
    fn from(e: std::io::Error) -> Self {
        ChronicleError::Io(Arc::new(e))
    }
}

pub type Result<T> = std::result::Result<T, ChronicleError>;
