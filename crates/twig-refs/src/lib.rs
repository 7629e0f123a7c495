//! Reference management for Twig.
//!
//! This crate provides named references (branches and HEAD) that point to
//! commits in the object store. References are the only mutable state in a
//! repository; every other object is immutable and content-addressed.
//!
//! # Architecture
//!
//! - **Branches** live under `refs/heads/` and advance as commits are
//!   published. They only ever move through [`RefStore::update_ref`], an
//!   atomic compare-and-swap: a writer states the value it expects to
//!   replace, and the update is refused if another writer got there first.
//! - **HEAD** is a symbolic ref naming the current branch, or a detached ref
//!   pointing directly at a commit.
//!
//! # Modules
//!
//! - [`error`] -- [`RefError`] and the compare-and-swap [`RefUpdateError`]
//! - [`types`] -- Core ref types: [`Ref`], [`BranchInfo`], [`Head`], [`UpdateOutcome`]
//! - [`traits`] -- The [`RefStore`] trait defining the storage interface
//! - [`names`] -- Branch and ref name validation
//! - [`memory`] -- In-memory [`InMemoryRefStore`] for tests and embedding
//! - [`file`] -- Loose-file [`FileRefStore`] with git-style lock files

pub mod error;
pub mod file;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, RefUpdateError, Result};
pub use file::FileRefStore;
pub use memory::InMemoryRefStore;
pub use names::{branch_ref_name, validate_branch_name, validate_ref_name, HEADS_PREFIX};
pub use traits::RefStore;
pub use types::{BranchInfo, Head, Ref, UpdateOutcome};
