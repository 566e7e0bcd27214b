//! Backend contract for experiment storage

use crate::error::StoreError;
use cohort_experiment::Experiment;
use std::sync::Arc;

/// Key-value storage for registered experiments
///
/// Implementations must be safe to share between request handlers: a `get`
/// racing a `set` sees either the previous state or the complete new entry.
/// Failures are returned as-is; retry policy belongs to the caller.
pub trait ExperimentStore: Send + Sync {
    /// Fetch experiment by key, `Ok(None)` when absent
    ///
    /// # Errors
    /// Backend failure.
    fn get(&self, key: &str) -> Result<Option<Arc<Experiment>>, StoreError>;

    /// Store experiment under key, replacing any previous entry
    ///
    /// # Errors
    /// Backend failure.
    fn set(&self, key: &str, experiment: Arc<Experiment>) -> Result<(), StoreError>;

    /// Remove entry; absent keys are not an error
    ///
    /// # Errors
    /// Backend failure.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

impl<S: ExperimentStore + ?Sized> ExperimentStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<Arc<Experiment>>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, experiment: Arc<Experiment>) -> Result<(), StoreError> {
        (**self).set(key, experiment)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}
