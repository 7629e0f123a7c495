use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use twig_crypto::ContentHasher;
use twig_types::{Identity, ObjectId};

use crate::error::{StoreError, StoreResult};

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Raw file content.
    Blob,
    /// Directory listing: canonically ordered entries.
    Tree,
    /// Tree snapshot with parent and metadata.
    Commit,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::Tree => write!(f, "tree"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// A stored object: kind tag + serialized data + cached size.
///
/// `StoredObject` is the unit of storage. Its ID is derived from the kind and
/// the data alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
    pub size: u64,
}

impl StoredObject {
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Compute the content-addressed ID for this object.
    pub fn compute_id(&self) -> ObjectId {
        let hasher = match self.kind {
            ObjectKind::Blob => &ContentHasher::BLOB,
            ObjectKind::Tree => &ContentHasher::TREE,
            ObjectKind::Commit => &ContentHasher::COMMIT,
        };
        hasher.hash(&self.data)
    }

    fn expect_kind(&self, kind: ObjectKind) -> StoreResult<()> {
        if self.kind != kind {
            return Err(self.corrupt(format!("expected {kind}, got {}", self.kind)));
        }
        Ok(())
    }

    /// Error for a stored object that cannot be decoded.
    fn corrupt(&self, reason: impl Into<String>) -> StoreError {
        StoreError::CorruptObject {
            id: self.compute_id(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw content object (analogous to git blob).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Blob)?;
        Ok(Self {
            data: obj.data.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// File mode for a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
    /// Symbolic link (0o120000).
    Symlink,
    /// Subtree / directory (0o040000).
    Directory,
}

impl EntryMode {
    /// Octal mode value (for display).
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Directory => 0o040000,
        }
    }

    pub fn from_mode_bits(bits: u32) -> Option<Self> {
        match bits {
            0o100644 => Some(Self::Regular),
            0o100755 => Some(Self::Executable),
            0o120000 => Some(Self::Symlink),
            0o040000 => Some(Self::Directory),
            _ => None,
        }
    }

    /// `true` when the entry references a tree rather than a blob.
    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub mode: EntryMode,
    /// Single path segment: no `/`, no NUL, not `.` or `..`.
    pub name: String,
    pub object_id: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: EntryMode, name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            object_id,
        }
    }

    /// Entry for a regular file blob.
    pub fn file(name: impl Into<String>, object_id: ObjectId) -> Self {
        Self::new(EntryMode::Regular, name, object_id)
    }

    /// Entry for a subtree.
    pub fn dir(name: impl Into<String>, object_id: ObjectId) -> Self {
        Self::new(EntryMode::Directory, name, object_id)
    }

    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }

    /// Canonical git tree ordering.
    ///
    /// Names compare byte-wise, except that a directory compares as if its
    /// name had a trailing `/`. So `a.txt` < `a/` < `a0`, while the plain
    /// byte order of the names alone would put `a` first.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        let suffix = |e: &Self| e.is_tree().then_some(b'/');
        self.name
            .bytes()
            .chain(suffix(self))
            .cmp(other.name.bytes().chain(suffix(other)))
    }

    /// Check that `name` is a usable single path segment.
    pub fn validate_name(name: &str) -> Result<(), String> {
        if name.is_empty() {
            return Err("entry name must not be empty".into());
        }
        if name == "." || name == ".." {
            return Err(format!("entry name {name:?} is reserved"));
        }
        if let Some(ch) = name.chars().find(|c| *c == '/' || *c == '\0') {
            return Err(format!("entry name {name:?} contains {ch:?}"));
        }
        Ok(())
    }
}

/// Directory listing object (analogous to git tree).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Entries in canonical order.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a tree, sorting `entries` into canonical order.
    ///
    /// Sorting does not deduplicate; call [`Tree::validate`] (or write through
    /// [`crate::ObjectStore::insert_tree`]) to reject duplicate names.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(TreeEntry::canonical_cmp);
        Self { entries }
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Verify names, uniqueness and strictly ascending canonical order.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            TreeEntry::validate_name(&entry.name)?;
            if entry.object_id.is_null() {
                return Err(format!("entry {:?} references the null id", entry.name));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(format!("duplicate entry name {:?}", entry.name));
            }
        }
        for pair in self.entries.windows(2) {
            if pair[0].canonical_cmp(&pair[1]) != Ordering::Less {
                return Err(format!(
                    "entries out of order: {:?} before {:?}",
                    pair[0].name, pair[1].name
                ));
            }
        }
        Ok(())
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Tree, data))
    }

    /// Decode from a `StoredObject`, rejecting trees that are not canonical.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Tree)?;
        let tree: Self = serde_json::from_slice(&obj.data).map_err(|e| obj.corrupt(e.to_string()))?;
        tree.validate().map_err(|reason| obj.corrupt(reason))?;
        Ok(tree)
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Commit object: binds a tree snapshot to its parent and metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub tree: ObjectId,
    /// Zero parents for a root commit, one otherwise.
    pub parents: Vec<ObjectId>,
    pub author: Identity,
    pub committer: Identity,
    pub message: String,
}

impl Commit {
    /// The first parent, if any.
    pub fn parent(&self) -> Option<ObjectId> {
        self.parents.first().copied()
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Commit, data))
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Commit)?;
        serde_json::from_slice(&obj.data).map_err(|e| obj.corrupt(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use proptest::prelude::*;

    fn id(tag: &[u8]) -> ObjectId {
        ObjectId::from_bytes(tag)
    }

    fn names(tree: &Tree) -> Vec<&str> {
        tree.entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn blob_kind_mismatch() {
        let stored = StoredObject::new(ObjectKind::Tree, b"not a blob".to_vec());
        let err = Blob::from_stored_object(&stored).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn directory_sorts_as_if_slash_suffixed() {
        let tree = Tree::new(vec![
            TreeEntry::file("a0", id(b"3")),
            TreeEntry::dir("a", id(b"2")),
            TreeEntry::file("a.txt", id(b"1")),
        ]);
        // '.' (0x2e) < '/' (0x2f) < '0' (0x30)
        assert_eq!(names(&tree), vec!["a.txt", "a", "a0"]);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn file_sorts_before_longer_name_with_same_prefix() {
        let tree = Tree::new(vec![
            TreeEntry::file("ab", id(b"2")),
            TreeEntry::file("a", id(b"1")),
        ]);
        assert_eq!(names(&tree), vec!["a", "ab"]);
    }

    #[test]
    fn sorting_is_bytewise_not_locale() {
        let tree = Tree::new(vec![
            TreeEntry::file("b", id(b"1")),
            TreeEntry::file("B", id(b"2")),
            TreeEntry::file("_", id(b"3")),
        ]);
        assert_eq!(names(&tree), vec!["B", "_", "b"]);
    }

    #[test]
    fn validate_rejects_out_of_order() {
        let tree = Tree {
            entries: vec![
                TreeEntry::dir("b", id(b"1")),
                TreeEntry::file("a.txt", id(b"2")),
            ],
        };
        assert!(tree.validate().unwrap_err().contains("out of order"));
    }

    #[test]
    fn validate_rejects_file_and_dir_with_same_name() {
        let tree = Tree::new(vec![
            TreeEntry::file("a", id(b"1")),
            TreeEntry::dir("a", id(b"2")),
        ]);
        assert!(tree.validate().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn validate_rejects_bad_names() {
        for bad in ["", ".", "..", "a/b", "nul\0"] {
            let tree = Tree::new(vec![TreeEntry::file(bad, id(b"x"))]);
            assert!(tree.validate().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn validate_rejects_null_object_id() {
        let tree = Tree::new(vec![TreeEntry::file("a", ObjectId::null())]);
        assert!(tree.validate().is_err());
    }

    #[test]
    fn decoding_rejects_non_canonical_tree() {
        let raw = Tree {
            entries: vec![
                TreeEntry::file("z", id(b"1")),
                TreeEntry::file("a", id(b"2")),
            ],
        };
        let stored = raw.to_stored_object().unwrap();
        let err = Tree::from_stored_object(&stored).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn undecodable_commit_is_corrupt() {
        let stored = StoredObject::new(ObjectKind::Commit, b"not json".to_vec());
        let err = Commit::from_stored_object(&stored).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { id, .. } if id == stored.compute_id()));
    }

    #[test]
    fn tree_get_entry() {
        let tree = Tree::new(vec![
            TreeEntry::file("a.txt", id(b"a")),
            TreeEntry::dir("sub", id(b"s")),
        ]);
        assert!(tree.get("sub").unwrap().is_tree());
        assert!(tree.get("missing").is_none());
        assert_eq!(tree.len(), 2);
        assert!(Tree::empty().is_empty());
    }

    #[test]
    fn empty_tree_has_stable_id() {
        let a = Tree::empty().to_stored_object().unwrap().compute_id();
        let b = Tree::new(vec![]).to_stored_object().unwrap().compute_id();
        assert_eq!(a, b);
    }

    #[test]
    fn entry_mode_bits() {
        assert_eq!(EntryMode::Directory.mode_bits(), 0o040000);
        assert_eq!(EntryMode::from_mode_bits(0o100755), Some(EntryMode::Executable));
        assert!(EntryMode::from_mode_bits(0o777).is_none());
        assert_eq!(EntryMode::Regular.to_string(), "100644");
        assert!(EntryMode::Directory.is_tree());
        assert!(!EntryMode::Symlink.is_tree());
    }

    #[test]
    fn commit_decodes_and_reports_parent() {
        let when = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
            .unwrap();
        let who = Identity::at("a", "a@example.com", when);
        let commit = Commit {
            tree: id(b"tree"),
            parents: vec![id(b"parent")],
            author: who.clone(),
            committer: who,
            message: "Testing".into(),
        };
        let stored = commit.to_stored_object().unwrap();
        assert_eq!(stored.kind, ObjectKind::Commit);
        let decoded = Commit::from_stored_object(&stored).unwrap();
        assert_eq!(decoded.parent(), Some(id(b"parent")));
        assert!(!decoded.is_root());
    }

    #[test]
    fn different_kinds_produce_different_ids() {
        let data = b"same data".to_vec();
        let blob = StoredObject::new(ObjectKind::Blob, data.clone());
        let tree = StoredObject::new(ObjectKind::Tree, data.clone());
        let commit = StoredObject::new(ObjectKind::Commit, data);
        assert_ne!(blob.compute_id(), tree.compute_id());
        assert_ne!(blob.compute_id(), commit.compute_id());
    }

    fn arb_entry() -> impl Strategy<Value = TreeEntry> {
        ("[a-c.0/_-]{1,4}", any::<bool>()).prop_filter_map("valid name", |(name, is_dir)| {
            TreeEntry::validate_name(&name).ok()?;
            let mode = if is_dir { EntryMode::Directory } else { EntryMode::Regular };
            Some(TreeEntry::new(mode, name.clone(), ObjectId::from_bytes(name.as_bytes())))
        })
    }

    proptest! {
        #[test]
        fn sorted_unique_trees_always_validate(entries in proptest::collection::vec(arb_entry(), 0..12)) {
            let mut seen = HashSet::new();
            let unique: Vec<TreeEntry> = entries
                .into_iter()
                .filter(|e| seen.insert(e.name.clone()))
                .collect();
            let tree = Tree::new(unique);
            prop_assert!(tree.validate().is_ok());
            for pair in tree.entries.windows(2) {
                let left: Vec<u8> = pair[0].name.bytes().chain(pair[0].is_tree().then_some(b'/')).collect();
                let right: Vec<u8> = pair[1].name.bytes().chain(pair[1].is_tree().then_some(b'/')).collect();
                prop_assert!(left < right);
            }
        }
    }
}
