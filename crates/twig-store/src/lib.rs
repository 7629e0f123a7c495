//! Content-addressed object storage for Twig.
//!
//! This crate implements a hash-keyed object store analogous to git's
//! `.git/objects/` directory. Blobs, trees and commits are stored as
//! immutable objects identified by their BLAKE3 hash (domain-separated by
//! object kind).
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content
//! - [`Tree`] -- directory listing in canonical git order
//! - [`Commit`] -- tree snapshot plus parent, identities and message
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Concurrent reads are always safe (objects are immutable).
//! 3. The store never interprets object contents on the write path except to
//!    validate tree ordering in [`ObjectStore::insert_tree`].
//! 4. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryObjectStore, WriteStats};
pub use object::{Blob, Commit, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::{ObjectStore, TreeEntries};
