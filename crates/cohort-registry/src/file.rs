//! File-backed experiment store
//!
//! Keeps the whole key -> experiment map in one JSON document. Reads are
//! served from memory; every mutation rewrites the file through a temporary
//! sibling and an atomic rename, so a crash never leaves a half-written map.

use crate::error::StoreError;
use crate::store::ExperimentStore;
use cohort_experiment::Experiment;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Durable store persisting experiments as JSON
#[derive(Debug)]
pub struct FileExperimentStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, Arc<Experiment>>>,
}

impl FileExperimentStore {
    /// Open store at `path`, loading existing entries
    ///
    /// A missing or empty file yields an empty store. Entries are validated on
    /// load exactly as at registration.
    ///
    /// # Errors
    /// - `StoreError::Io` if the file exists but cannot be read
    /// - `StoreError::Serialization` if it does not hold a valid map
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => {
                let parsed: BTreeMap<String, Experiment> = serde_json::from_str(&raw)
                    .map_err(|source| StoreError::Serialization {
                        path: path.clone(),
                        source,
                    })?;
                parsed
                    .into_iter()
                    .map(|(key, exp)| (key, Arc::new(exp)))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::io_error(&path, e)),
        };

        tracing::debug!(path = %path.display(), count = entries.len(), "opened experiment store");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Backing file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored experiments
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn persist(&self, entries: &BTreeMap<String, Arc<Experiment>>) -> Result<(), StoreError> {
        let view: BTreeMap<&str, &Experiment> = entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_ref()))
            .collect();
        let json = serde_json::to_vec_pretty(&view).map_err(|source| {
            StoreError::Serialization {
                path: self.path.clone(),
                source,
            }
        })?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io_error(dir, e))?;
        tmp.write_all(&json)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io_error(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io_error(&self.path, e.error))?;
        Ok(())
    }
}

impl ExperimentStore for FileExperimentStore {
    fn get(&self, key: &str) -> Result<Option<Arc<Experiment>>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, experiment: Arc<Experiment>) -> Result<(), StoreError> {
        let mut guard = self.entries.write();
        let mut next = guard.clone();
        next.insert(key.to_string(), experiment);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.write();
        if !guard.contains_key(key) {
            return Ok(());
        }
        let mut next = guard.clone();
        next.remove(key);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }
}
