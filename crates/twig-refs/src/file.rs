//! Loose-file reference store.
//!
//! Layout under the store root, as in a git directory:
//!
//! ```text
//! HEAD                  "ref: refs/heads/main\n" or a commit id
//! refs/heads/main       commit id in hex, newline-terminated
//! refs/heads/main.lock  present only while a writer holds the ref
//! ```
//!
//! Every write goes through a `<name>.lock` file opened with create-new
//! semantics: whoever creates the lock owns the ref until the lock is renamed
//! over the ref (commit) or removed (abort). A second writer that finds the
//! lock present fails with [`RefUpdateError::LockFailure`] instead of
//! waiting.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use twig_types::ObjectId;
use walkdir::WalkDir;

use crate::error::{RefError, RefUpdateError, Result};
use crate::names::{branch_ref_name, validate_branch_name, validate_ref_name};
use crate::traits::{check_expected, RefStore};
use crate::types::{Head, Ref, UpdateOutcome};

const HEAD_FILE: &str = "HEAD";
const SYMREF_PREFIX: &str = "ref: ";
const LOCK_SUFFIX: &str = ".lock";

/// A held `<file>.lock`. Removed on drop unless committed.
struct LockFile {
    lock_path: PathBuf,
    target: PathBuf,
    file: Option<File>,
    released: bool,
}

impl LockFile {
    /// Take the lock for `target`. `Ok(None)` if another writer holds it.
    fn acquire(target: &Path) -> io::Result<Option<Self>> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut lock_path = target.as_os_str().to_owned();
        lock_path.push(LOCK_SUFFIX);
        let lock_path = PathBuf::from(lock_path);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(file) => Ok(Some(Self {
                lock_path,
                target: target.to_path_buf(),
                file: Some(file),
                released: false,
            })),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write `contents` and atomically replace the target with it.
    fn commit(mut self, contents: &str) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&self.lock_path, &self.target)?;
        self.released = true;
        Ok(())
    }

    /// Remove the target while holding the lock.
    fn remove_target(self) -> io::Result<bool> {
        match fs::remove_file(&self.target) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        self.file.take();
        if !self.released {
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}

/// A [`RefStore`] backed by loose files on disk.
#[derive(Debug, Clone)]
pub struct FileRefStore {
    root: PathBuf,
}

impl FileRefStore {
    /// Open (or create) a ref store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("refs").join("heads"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        name.split('/')
            .fold(self.root.clone(), |path, component| path.join(component))
    }

    fn read_target(&self, name: &str, path: &Path) -> Result<Option<ObjectId>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        ObjectId::from_hex(&contents)
            .map(Some)
            .map_err(|e| RefError::Corrupt {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    fn write_head(&self, contents: &str) -> Result<()> {
        let lock = LockFile::acquire(&self.root.join(HEAD_FILE))?.ok_or_else(|| {
            RefError::Io(io::Error::new(
                io::ErrorKind::WouldBlock,
                "HEAD is locked by another writer",
            ))
        })?;
        lock.commit(contents)?;
        Ok(())
    }
}

impl RefStore for FileRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        validate_ref_name(name)?;
        Ok(self
            .read_target(name, &self.ref_path(name))?
            .map(|target| Ref::new(name, target)))
    }

    fn update_ref(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> std::result::Result<UpdateOutcome, RefUpdateError> {
        validate_ref_name(name)?;
        let path = self.ref_path(name);

        let Some(lock) = LockFile::acquire(&path).map_err(RefError::from)? else {
            warn!(name, "ref update refused: lock held");
            return Err(RefUpdateError::LockFailure {
                name: name.to_string(),
            });
        };

        let current = self.read_target(name, &path)?;
        let outcome = check_expected(name, current, expected, new)?;
        if outcome != UpdateOutcome::Unchanged {
            lock.commit(&format!("{}\n", new.to_hex()))
                .map_err(RefError::from)?;
        }
        debug!(name, new = %new.short_hex(), ?outcome, "ref updated");
        Ok(outcome)
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        validate_ref_name(name)?;
        if let Some(Head::Symbolic(current)) = self.head()? {
            if name == branch_ref_name(&current) {
                return Err(RefError::DeleteCurrentBranch { name: current });
            }
        }

        let lock = LockFile::acquire(&self.ref_path(name))?.ok_or_else(|| {
            RefError::Io(io::Error::new(
                io::ErrorKind::WouldBlock,
                format!("{name} is locked by another writer"),
            ))
        })?;
        let existed = lock.remove_target()?;
        debug!(name, existed, "ref deleted");
        Ok(existed)
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<Ref>> {
        let mut refs = Vec::new();
        for entry in WalkDir::new(self.root.join("refs")).sort_by_file_name() {
            let entry = entry.map_err(|e| RefError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if name.ends_with(LOCK_SUFFIX) || !name.starts_with(prefix) {
                continue;
            }
            if let Some(target) = self.read_target(&name, entry.path())? {
                refs.push(Ref::new(name, target));
            }
        }
        refs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(refs)
    }

    fn head(&self) -> Result<Option<Head>> {
        let contents = match fs::read_to_string(self.root.join(HEAD_FILE)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let contents = contents.trim();
        if let Some(target) = contents.strip_prefix(SYMREF_PREFIX) {
            let branch = target
                .strip_prefix(crate::names::HEADS_PREFIX)
                .ok_or_else(|| RefError::Corrupt {
                    name: HEAD_FILE.into(),
                    reason: format!("symbolic target outside refs/heads/: {target}"),
                })?;
            return Ok(Some(Head::Symbolic(branch.to_string())));
        }
        ObjectId::from_hex(contents)
            .map(|id| Some(Head::Detached(id)))
            .map_err(|e| RefError::Corrupt {
                name: HEAD_FILE.into(),
                reason: e.to_string(),
            })
    }

    fn set_head(&self, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;
        self.write_head(&format!("{SYMREF_PREFIX}{}\n", branch_ref_name(branch)))
    }

    fn set_head_detached(&self, target: ObjectId) -> Result<()> {
        self.write_head(&format!("{}\n", target.to_hex()))
    }
}
