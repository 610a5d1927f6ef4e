//! Whole-blob document storage.
//!
//! A store reads and writes one entire collection blob at a time. There is
//! no partial update and no concurrency control: the last writer wins.

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use serde_json::Value;
use tracing::debug;

use crate::{
    data_dir::DataDir,
    error::{Error, Result},
};

pub trait DocumentStore: Send + Sync {
    /// Read a blob. `Ok(None)` means the collection does not exist yet.
    fn read(&self, file_name: &str) -> Result<Option<Value>>;

    /// Replace a blob wholesale.
    fn write(&self, file_name: &str, blob: &Value) -> Result<()>;
}

/// Collection blobs stored as JSON files under one directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at an existing directory.
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::StoreUnavailable(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn from_data_dir(data_dir: &DataDir) -> Result<Self> {
        Self::open(data_dir.root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }
}

impl DocumentStore for LocalStore {
    fn read(&self, file_name: &str) -> Result<Option<Value>> {
        if !self.root.is_dir() {
            return Err(Error::StoreUnavailable(format!(
                "{} is no longer a directory",
                self.root.display()
            )));
        }

        let path = self.path_of(file_name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "collection file absent");
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::Unreadable {
                    file: file_name.to_string(),
                    source: e,
                });
            }
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn write(&self, file_name: &str, blob: &Value) -> Result<()> {
        if !self.root.is_dir() {
            return Err(Error::StoreUnavailable(format!(
                "{} is no longer a directory",
                self.root.display()
            )));
        }

        let path = self.path_of(file_name);
        let tmp = self.root.join(format!(".{file_name}.tmp"));
        let bytes = serde_json::to_vec_pretty(blob)?;
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), "collection file written");
        Ok(())
    }
}

/// In-process store, used by tests and embedders.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob directly.
    pub fn insert(&self, file_name: &str, blob: Value) {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file_name.to_string(), blob);
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, file_name: &str) -> Result<Option<Value>> {
        Ok(self
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(file_name)
            .cloned())
    }

    fn write(&self, file_name: &str, blob: &Value) -> Result<()> {
        self.insert(file_name, blob.clone());
        Ok(())
    }
}
