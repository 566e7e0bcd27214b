//! Experiment registry
//!
//! Provides [`Registry`], which enforces registration invariants on top of any
//! [`ExperimentStore`].

use crate::error::{RegistryError, StoreError};
use crate::memory::MemoryExperimentStore;
use crate::store::ExperimentStore;
use cohort_experiment::{Experiment, ExperimentDefinition, RegistrationError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Registry of experiments keyed by experiment key
///
/// Lookups go straight to the store. Registrations are serialized so that two
/// racing registrations of one key cannot both succeed.
///
/// A registration that fails validation leaves the key unregistered; it can be
/// retried with a corrected definition.
#[derive(Debug)]
pub struct Registry<S = MemoryExperimentStore> {
    store: S,
    registration: Mutex<()>,
}

impl Registry<MemoryExperimentStore> {
    /// Create registry over an empty in-memory store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(MemoryExperimentStore::new())
    }
}

impl Default for Registry<MemoryExperimentStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ExperimentStore> Registry<S> {
    /// Create registry over a store
    #[inline]
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            registration: Mutex::new(()),
        }
    }

    /// Register a validated experiment
    ///
    /// # Errors
    /// - `Registration(DuplicateKey)` if the key is already registered
    /// - `Store` if the backend fails
    pub fn register(&self, experiment: Experiment) -> Result<(), RegistryError> {
        let _guard = self.registration.lock();

        if self.store.get(experiment.key())?.is_some() {
            return Err(RegistrationError::duplicate(experiment.key()).into());
        }

        let key = experiment.key().to_string();
        let alternatives = experiment.alternatives().len();
        self.store.set(&key, Arc::new(experiment))?;

        tracing::info!(key = %key, alternatives, "registered experiment");
        Ok(())
    }

    /// Validate and register a definition
    ///
    /// # Errors
    /// Any validation failure, plus those of [`Registry::register`].
    pub fn register_definition(&self, definition: ExperimentDefinition) -> Result<(), RegistryError> {
        self.register(definition.validate()?)
    }

    /// Look up experiment by key, `Ok(None)` when not registered
    ///
    /// # Errors
    /// Backend failure, distinct from "not found".
    #[inline]
    pub fn lookup(&self, key: &str) -> Result<Option<Arc<Experiment>>, StoreError> {
        self.store.get(key)
    }

    /// Remove experiment; absent keys are not an error
    ///
    /// # Errors
    /// Backend failure.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.registration.lock();
        self.store.delete(key)
    }

    /// Underlying store
    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }
}
