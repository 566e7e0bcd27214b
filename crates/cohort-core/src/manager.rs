//! Experiment manager
//!
//! The public entry point: registers experiments, then starts and finishes
//! them for a client whose state travels in a token.

use crate::config::ManagerConfig;
use crate::error::ManagerError;
use cohort_experiment::{Experiment, ExperimentDefinition, Selector};
use cohort_persistence::{
    CookieResponse, FinishExperimentResponse, PersistenceProtocol, StartExperimentResponse,
    TokenSink, TokenSource,
};
use cohort_registry::{ExperimentStore, MemoryExperimentStore, Registry};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;

/// Experiment manager over a registry store and a random source
///
/// Safe to share between request handlers. The random source is locked only
/// for the duration of a draw.
#[derive(Debug)]
pub struct ExperimentManager<S = MemoryExperimentStore, R = StdRng> {
    config: ManagerConfig,
    registry: Registry<S>,
    protocol: PersistenceProtocol,
    selector: Mutex<Selector<R>>,
}

impl ExperimentManager {
    /// Manager with default config, in-memory registry and entropy-seeded draws
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Manager with `config`; configured experiments are not registered
    #[must_use]
    pub fn with_config(config: ManagerConfig) -> Self {
        Self::with_parts(config, MemoryExperimentStore::new(), Selector::from_entropy())
    }

    /// Manager with a fixed seed, for reproducible draws
    #[must_use]
    pub fn seeded(config: ManagerConfig, seed: u64) -> Self {
        Self::with_parts(config, MemoryExperimentStore::new(), Selector::seeded(seed))
    }

    /// Manager with `config`, registering every configured experiment
    ///
    /// # Errors
    /// The first registration failure; see [`ExperimentManager::register_configured`].
    pub fn from_config(config: ManagerConfig) -> Result<Self, ManagerError> {
        let manager = Self::with_config(config);
        manager.register_configured()?;
        Ok(manager)
    }
}

impl Default for ExperimentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ExperimentStore, R: Rng> ExperimentManager<S, R> {
    /// Assemble a manager from its parts
    ///
    /// `config` is taken as-is; a token name outside the cookie-name grammar
    /// surfaces as `TransportError::InvalidName` on the first cookie write.
    pub fn with_parts(config: ManagerConfig, store: S, selector: Selector<R>) -> Self {
        let protocol = PersistenceProtocol::new(config.token_name.clone());
        Self {
            config,
            registry: Registry::with_store(store),
            protocol,
            selector: Mutex::new(selector),
        }
    }

    /// Register every experiment listed in the config
    ///
    /// Stops at the first failure; experiments before it stay registered.
    ///
    /// # Errors
    /// - `Config` if the config itself is unusable
    /// - `Registration` for an invalid or duplicate definition
    /// - `Store` if the backend fails
    pub fn register_configured(&self) -> Result<(), ManagerError> {
        self.config.check()?;
        for definition in &self.config.experiments {
            self.register_definition(definition.clone())?;
        }
        Ok(())
    }

    /// Register an experiment
    ///
    /// # Errors
    /// - `Registration(DuplicateKey)` if the key is taken
    /// - `Store` if the backend fails
    pub fn register_experiment(&self, experiment: Experiment) -> Result<(), ManagerError> {
        self.registry.register(experiment)?;
        Ok(())
    }

    /// Validate and register a definition
    ///
    /// # Errors
    /// Any validation failure, plus those of [`ExperimentManager::register_experiment`].
    pub fn register_definition(&self, definition: ExperimentDefinition) -> Result<(), ManagerError> {
        self.registry.register_definition(definition)?;
        Ok(())
    }

    /// Registered experiment by key
    ///
    /// # Errors
    /// - `NotFound` if the key was never registered
    /// - `Store` if the backend fails
    pub fn lookup_experiment(&self, key: &str) -> Result<Arc<Experiment>, ManagerError> {
        self.registry
            .lookup(key)?
            .ok_or_else(|| ManagerError::not_found(key))
    }

    /// Remove an experiment; absent keys are not an error
    ///
    /// # Errors
    /// `Store` if the backend fails.
    pub fn remove_experiment(&self, key: &str) -> Result<(), ManagerError> {
        self.registry.remove(key)?;
        tracing::debug!(key, "removed experiment");
        Ok(())
    }

    /// Start experiment `key` for the client behind `source`/`sink`
    ///
    /// Assigns an alternative on first call; later calls report the stored one
    /// and rewrite the token unchanged.
    ///
    /// # Errors
    /// - `NotFound` if the key was never registered
    /// - `Protocol` for token transport, codec or selection failures
    pub fn start_experiment<Src, Snk>(
        &self,
        key: &str,
        source: &Src,
        sink: &mut Snk,
    ) -> Result<StartExperimentResponse, ManagerError>
    where
        Src: TokenSource + ?Sized,
        Snk: TokenSink + ?Sized,
    {
        let experiment = self.lookup_experiment(key)?;
        let response = self.protocol.start(&experiment, source, sink, |e| {
            self.selector.lock().choose(e).map(str::to_string)
        })?;
        Ok(response)
    }

    /// Finish experiment `key` for the client behind `source`/`sink`
    ///
    /// Only the first finish after an assignment reports `did_finish_first_time`.
    ///
    /// # Errors
    /// - `NotFound` if the key was never registered
    /// - `Protocol` for token transport or codec failures
    pub fn finish_experiment<Src, Snk>(
        &self,
        key: &str,
        source: &Src,
        sink: &mut Snk,
    ) -> Result<FinishExperimentResponse, ManagerError>
    where
        Src: TokenSource + ?Sized,
        Snk: TokenSink + ?Sized,
    {
        let experiment = self.lookup_experiment(key)?;
        Ok(self.protocol.finish(&experiment, source, sink)?)
    }

    /// Empty cookie response carrying the configured attributes
    #[inline]
    #[must_use]
    pub fn cookie_response(&self) -> CookieResponse {
        self.config.cookie_response()
    }

    /// Configuration
    #[inline]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Token name in use
    #[inline]
    pub fn token_name(&self) -> &str {
        self.protocol.token_name()
    }

    /// Underlying registry
    #[inline]
    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }
}
