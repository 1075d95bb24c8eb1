//! Quality selections waiting for the operator's click.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use uuid::Uuid;

/// A `/startmedia` request waiting for a quality choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection {
    pub source_url: String,
    pub display_name: String,
}

#[derive(Debug)]
struct Entry {
    selection: PendingSelection,
    created_at: Instant,
}

/// Pending selections keyed by an opaque id embedded in the buttons.
///
/// Each selection can be taken once; selections older than the TTL are
/// treated as missing.
#[derive(Debug)]
pub struct SelectionStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl SelectionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores a selection and returns its id.
    ///
    /// Ids contain no underscores so they can follow a `quality_<tier>_`
    /// prefix unambiguously.
    pub fn insert(&self, selection: PendingSelection) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let mut entries = self.lock();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.created_at.elapsed() < ttl);
        entries.insert(
            id.clone(),
            Entry {
                selection,
                created_at: Instant::now(),
            },
        );
        id
    }

    /// Removes and returns a live selection.
    pub fn take(&self, id: &str) -> Option<PendingSelection> {
        let entry = self.lock().remove(id)?;
        (entry.created_at.elapsed() < self.ttl).then_some(entry.selection)
    }

    pub fn remove(&self, id: &str) {
        self.lock().remove(id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
