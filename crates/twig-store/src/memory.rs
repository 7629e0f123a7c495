use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use tracing::trace;
use twig_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// Write counters for an [`InMemoryObjectStore`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteStats {
    /// Every call to `write`, including duplicates.
    pub calls: u64,
    /// Writes that added an object not already present.
    pub new_objects: u64,
}

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. All objects are held in memory behind a
/// `RwLock` for safe concurrent access. Write counters let tests check which
/// objects a patch actually touched.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
    calls: AtomicU64,
    new_objects: AtomicU64,
    read_only: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            calls: AtomicU64::new(0),
            new_objects: AtomicU64::new(0),
            read_only: AtomicBool::new(false),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|obj| obj.size)
            .sum()
    }

    /// Snapshot of the write counters.
    pub fn write_stats(&self) -> WriteStats {
        WriteStats {
            calls: self.calls.load(Ordering::SeqCst),
            new_objects: self.new_objects.load(Ordering::SeqCst),
        }
    }

    /// Reject all subsequent writes with [`StoreError::ReadOnly`].
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(id).cloned())
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::ReadOnly);
        }
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut map = self.objects.write().expect("lock poisoned");
        if !map.contains_key(&id) {
            map.insert(id, object.clone());
            self.new_objects.fetch_add(1, Ordering::SeqCst);
            trace!(id = %id.short_hex(), kind = %object.kind, size = object.size, "stored object");
        }
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        Ok(map.remove(id).is_some())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .field("write_stats", &self.write_stats())
            .finish()
    }
}
