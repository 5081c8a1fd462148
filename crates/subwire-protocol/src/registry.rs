//! Per-session operation registry.
//!
//! Maps live operation ids to their cancel handles. Insertion marks an
//! operation live; removal stops it. An id appears at most once at any
//! instant, which is what makes a repeated `start` a silent no-op.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Registry of active operations for one session.
///
/// All access happens from the session's own processing context; the inner
/// mutex only serializes against the streams the handler hands out.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: Mutex<HashMap<String, CancellationToken>>,
}

impl OperationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `token` under `id` if the id is not live.
    ///
    /// Returns `false` without touching the map when the id already exists.
    pub fn try_insert(&self, id: &str, token: CancellationToken) -> bool {
        match self.operations.lock().entry(id.to_owned()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(token);
                true
            }
        }
    }

    /// Remove and return the cancel handle for `id`, if live.
    pub fn remove(&self, id: &str) -> Option<CancellationToken> {
        self.operations.lock().remove(id)
    }

    /// Remove and return every cancel handle. Used on transport close.
    pub fn drain_all(&self) -> Vec<CancellationToken> {
        self.operations
            .lock()
            .drain()
            .map(|(_, token)| token)
            .collect()
    }

    /// Whether `id` is live.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.operations.lock().contains_key(id)
    }

    /// Number of live operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.lock().len()
    }

    /// Whether no operations are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.lock().is_empty()
    }
}
