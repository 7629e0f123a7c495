use twig_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, Commit, StoredObject, Tree, TreeEntry};

/// Entries of one tree, yielded in canonical order.
pub type TreeEntries = std::vec::IntoIter<TreeEntry>;

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. Content-addressing guarantees this:
///   the same data always produces the same ID.
/// - Concurrent reads are always safe (objects are immutable).
/// - All backend errors are propagated, never silently ignored.
///
/// Backends implement the four primitives; the typed `insert_*`/`read_*`
/// helpers and [`ObjectStore::enumerate_tree`] are provided on top of them.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed ID.
    ///
    /// If the object already exists, this is a no-op (idempotent).
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Delete an object by ID. Returns `true` if the object existed.
    ///
    /// Intended for garbage collection only.
    fn delete(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read an object that must exist.
    fn read_required(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        self.read(id)?.ok_or(StoreError::NotFound(*id))
    }

    /// Store file content as a blob.
    fn insert_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        self.write(&StoredObject::new(crate::ObjectKind::Blob, data.to_vec()))
    }

    /// Store a directory listing.
    ///
    /// Entries are put into canonical order first; duplicate or invalid names
    /// are rejected with [`StoreError::MalformedTree`].
    fn insert_tree(&self, entries: Vec<TreeEntry>) -> StoreResult<ObjectId> {
        let tree = Tree::new(entries);
        tree.validate().map_err(StoreError::MalformedTree)?;
        self.write(&tree.to_stored_object()?)
    }

    fn insert_commit(&self, commit: &Commit) -> StoreResult<ObjectId> {
        self.write(&commit.to_stored_object()?)
    }

    fn read_blob(&self, id: &ObjectId) -> StoreResult<Blob> {
        Blob::from_stored_object(&self.read_required(id)?)
    }

    fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        Tree::from_stored_object(&self.read_required(id)?)
    }

    fn read_commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        Commit::from_stored_object(&self.read_required(id)?)
    }

    /// Iterate the entries of a tree in canonical order.
    ///
    /// Fails with [`StoreError::NotFound`] for an unknown ID and
    /// [`StoreError::CorruptObject`] if the ID names a non-tree.
    fn enumerate_tree(&self, id: &ObjectId) -> StoreResult<TreeEntries> {
        Ok(self.read_tree(id)?.entries.into_iter())
    }
}
