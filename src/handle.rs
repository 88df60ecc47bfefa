//! Ephemeral local handles for user-selected files.
//!
//! A handle stands in for a file the user picked during this process's
//! lifetime. It is never persisted and never uploaded; it only lets the UI
//! refer back to the file while the attachment is alive.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(Uuid);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local:{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct HandleEntry {
    name: String,
    source: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct Inner {
    live: Mutex<HashMap<HandleId, HandleEntry>>,
    created: AtomicU64,
    released: AtomicU64,
}

/// Shared registry of live handles. Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct HandleTable {
    inner: Arc<Inner>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self) -> MutexGuard<'_, HashMap<HandleId, HandleEntry>> {
        self.inner.live.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn create(&self, name: impl Into<String>, source: Option<PathBuf>) -> LocalHandle {
        let id = HandleId(Uuid::new_v4());
        let entry = HandleEntry {
            name: name.into(),
            source,
        };
        debug!("Created handle {} for {}", id, entry.name);
        self.live().insert(id, entry);
        self.inner.created.fetch_add(1, Ordering::Relaxed);

        LocalHandle {
            id,
            table: self.clone(),
            released: false,
        }
    }

    /// Removes the entry. Returns false when the handle was already gone.
    fn revoke(&self, id: HandleId) -> bool {
        let removed = self.live().remove(&id);
        match removed {
            Some(entry) => {
                self.inner.released.fetch_add(1, Ordering::Relaxed);
                debug!("Released handle {} for {}", id, entry.name);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_live(&self, id: HandleId) -> bool {
        self.live().contains_key(&id)
    }

    pub fn source(&self, id: HandleId) -> Option<PathBuf> {
        self.live().get(&id).and_then(|e| e.source.clone())
    }

    pub fn live_count(&self) -> usize {
        self.live().len()
    }

    pub fn created_count(&self) -> u64 {
        self.inner.created.load(Ordering::Relaxed)
    }

    pub fn released_count(&self) -> u64 {
        self.inner.released.load(Ordering::Relaxed)
    }
}

/// Owned guard for one live handle. Not `Clone`: whoever holds it is the
/// only party that can release it.
#[derive(Debug)]
pub struct LocalHandle {
    id: HandleId,
    table: HandleTable,
    released: bool,
}

impl LocalHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn release(mut self) {
        self.released = true;
        self.table.revoke(self.id);
    }
}

impl Drop for LocalHandle {
    fn drop(&mut self) {
        if !self.released {
            self.table.revoke(self.id);
        }
    }
}
