//! Identity only. No per-consumer state is kept outside the PEL.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub name: String,
}

impl Consumer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
