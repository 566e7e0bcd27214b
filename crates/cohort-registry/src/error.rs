//! Error types for registry storage

use cohort_experiment::RegistrationError;
use std::path::PathBuf;

/// Errors raised by an experiment store backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error reading or writing the backing file
    #[error("io error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Backing file does not hold a valid experiment map
    #[error("invalid experiment data in {path}: {source}")]
    Serialization {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Backend-specific failure
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by [`Registry::register`](crate::Registry::register)
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Experiment failed validation or duplicates an existing key
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Store backend failed
    #[error("registry store failed: {0}")]
    Store(#[from] StoreError),
}
