//! Manager configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! token_name = "cohort"
//!
//! [cookie]
//! max_age_secs = 86400
//! secure = false
//!
//! [[experiments]]
//! key = "checkout_button"
//! alternatives = [{ name = "green" }, { name = "red", weight = 3 }]
//! ```

use crate::error::ConfigError;
use cohort_experiment::ExperimentDefinition;
use cohort_persistence::cookie::check_name;
use cohort_persistence::{CookieConfig, CookieResponse, DEFAULT_TOKEN_NAME};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Experiment manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Name under which the client token is read and written
    pub token_name: String,
    /// Attributes for written cookies
    pub cookie: CookieConfig,
    /// Experiments registered by `ExperimentManager::from_config`
    pub experiments: Vec<ExperimentDefinition>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            token_name: DEFAULT_TOKEN_NAME.to_string(),
            cookie: CookieConfig::default(),
            experiments: Vec::new(),
        }
    }
}

impl ManagerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With token name
    #[inline]
    #[must_use]
    pub fn with_token_name(mut self, name: impl Into<String>) -> Self {
        self.token_name = name.into();
        self
    }

    /// With cookie attributes
    #[inline]
    #[must_use]
    pub fn with_cookie(mut self, cookie: CookieConfig) -> Self {
        self.cookie = cookie;
        self
    }

    /// With an experiment to register at construction
    #[inline]
    #[must_use]
    pub fn with_experiment(mut self, definition: ExperimentDefinition) -> Self {
        self.experiments.push(definition);
        self
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// - `Parse` for invalid TOML or unknown shapes
    /// - `Invalid` for a token name unusable as a cookie name, or a zero cookie length ceiling
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.check()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// `Io` if the file cannot be read, otherwise as [`ManagerConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(
            path = %path.display(),
            experiments = config.experiments.len(),
            "loaded manager config"
        );
        Ok(config)
    }

    /// Empty cookie response carrying the configured attributes
    #[inline]
    #[must_use]
    pub fn cookie_response(&self) -> CookieResponse {
        CookieResponse::new(self.cookie.clone())
    }

    pub(crate) fn check(&self) -> Result<(), ConfigError> {
        check_name(&self.token_name).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.cookie.max_len == 0 {
            return Err(ConfigError::Invalid("cookie.max_len must be positive".to_string()));
        }
        Ok(())
    }
}
