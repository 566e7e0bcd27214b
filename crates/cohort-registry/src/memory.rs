//! In-memory experiment store backed by [`DashMap`]

use crate::error::StoreError;
use crate::store::ExperimentStore;
use cohort_experiment::Experiment;
use dashmap::DashMap;
use std::sync::Arc;

/// Concurrent in-memory store; contents live as long as the process
#[derive(Debug, Default)]
pub struct MemoryExperimentStore {
    entries: DashMap<String, Arc<Experiment>>,
}

impl MemoryExperimentStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of stored experiments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored keys, in no particular order
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

impl ExperimentStore for MemoryExperimentStore {
    fn get(&self, key: &str) -> Result<Option<Arc<Experiment>>, StoreError> {
        Ok(self.entries.get(key).map(|e| Arc::clone(e.value())))
    }

    fn set(&self, key: &str, experiment: Arc<Experiment>) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), experiment);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
