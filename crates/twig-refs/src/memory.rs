//! In-memory reference store for testing and embedding.
//!
//! [`InMemoryRefStore`] stores all refs in a `BTreeMap` protected by a
//! `RwLock`. Compare-and-swap updates hold the write lock across the
//! compare and the swap, so they are atomic across threads.

use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::debug;
use twig_types::ObjectId;

use crate::error::{RefError, RefUpdateError, Result};
use crate::names::{branch_ref_name, validate_branch_name, validate_ref_name};
use crate::traits::{check_expected, RefStore};
use crate::types::{Head, Ref, UpdateOutcome};

/// An in-memory implementation of [`RefStore`].
///
/// Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<BTreeMap<String, ObjectId>>,
    head: RwLock<Option<Head>>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        let refs = self.refs.read().map_err(|_| RefError::Poisoned)?;
        Ok(refs.get(name).map(|target| Ref::new(name, *target)))
    }

    fn update_ref(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> std::result::Result<UpdateOutcome, RefUpdateError> {
        validate_ref_name(name)?;

        let mut refs = self.refs.write().map_err(|_| RefUpdateError::LockFailure {
            name: name.to_string(),
        })?;
        let outcome = check_expected(name, refs.get(name).copied(), expected, new)?;
        if outcome != UpdateOutcome::Unchanged {
            refs.insert(name.to_string(), new);
        }
        debug!(name, new = %new.short_hex(), ?outcome, "ref updated");
        Ok(outcome)
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        // Prevent deleting the current branch.
        {
            let head = self.head.read().map_err(|_| RefError::Poisoned)?;
            if let Some(Head::Symbolic(current)) = head.as_ref() {
                if name == branch_ref_name(current) {
                    return Err(RefError::DeleteCurrentBranch {
                        name: current.clone(),
                    });
                }
            }
        }

        let mut refs = self.refs.write().map_err(|_| RefError::Poisoned)?;
        Ok(refs.remove(name).is_some())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<Ref>> {
        let refs = self.refs.read().map_err(|_| RefError::Poisoned)?;
        Ok(refs
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, target)| Ref::new(name.clone(), *target))
            .collect())
    }

    fn head(&self) -> Result<Option<Head>> {
        let head = self.head.read().map_err(|_| RefError::Poisoned)?;
        Ok(head.clone())
    }

    fn set_head(&self, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;

        let mut head = self.head.write().map_err(|_| RefError::Poisoned)?;
        *head = Some(Head::Symbolic(branch.to_string()));
        Ok(())
    }

    fn set_head_detached(&self, target: ObjectId) -> Result<()> {
        let mut head = self.head.write().map_err(|_| RefError::Poisoned)?;
        *head = Some(Head::Detached(target));
        Ok(())
    }
}
