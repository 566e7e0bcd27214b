//! Error types for the experiment manager
//!
//! Two families:
//! - Misuse (invalid or duplicate registration, bad configuration): meant to
//!   abort startup
//! - Recoverable (unknown key, token transport or codec failure, store
//!   failure): surfaced to the request handler unchanged

use cohort_experiment::RegistrationError;
use cohort_persistence::{CodecError, ProtocolError, TransportError};
use cohort_registry::{RegistryError, StoreError};
use std::path::PathBuf;

/// Main manager error type
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// Experiment key was never registered
    #[error("cannot retrieve experiment with key: `{key}`: you should register it first via `register_experiment`")]
    NotFound {
        /// Offending key
        key: String,
    },

    /// Experiment failed registration
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Registry backend failed
    #[error("experiment store failed: {0}")]
    Store(#[from] StoreError),

    /// Start or finish transition failed
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<RegistryError> for ManagerError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::Registration(e) => Self::Registration(e),
            RegistryError::Store(e) => Self::Store(e),
        }
    }
}

impl ManagerError {
    /// Create not-found error
    #[inline]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Check if error is a programming or configuration mistake
    #[inline]
    #[must_use]
    pub fn is_misuse(&self) -> bool {
        matches!(self, Self::Registration(_) | Self::Config(_))
    }

    /// Check if error can be handled at request time
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !self.is_misuse()
    }

    /// Check if error is an unknown experiment key
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Transport failure, if that is what this is
    #[must_use]
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Protocol(ProtocolError::Transport(e)) => Some(e),
            _ => None,
        }
    }

    /// Codec failure, if that is what this is
    #[must_use]
    pub fn codec(&self) -> Option<&CodecError> {
        match self {
            Self::Protocol(ProtocolError::Codec(e)) => Some(e),
            _ => None,
        }
    }

    /// Experiment key involved, when known
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::NotFound { key } => Some(key),
            Self::Registration(e) => Some(e.key()),
            _ => None,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("io error reading {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config is not valid TOML for this schema
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but holds an unusable value
    #[error("invalid configuration value: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_and_key() {
        let err = ManagerError::not_found("missing");
        assert!(err.to_string().contains("`missing`"));
        assert!(err.is_not_found());
        assert!(err.is_recoverable());
        assert_eq!(err.key(), Some("missing"));
    }

    #[test]
    fn registration_is_misuse() {
        let err: ManagerError = RegistrationError::duplicate("k").into();
        assert!(err.is_misuse());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn registry_error_flattens() {
        let err: ManagerError =
            RegistryError::Registration(RegistrationError::EmptyKey).into();
        assert!(matches!(err, ManagerError::Registration(RegistrationError::EmptyKey)));

        let err: ManagerError = RegistryError::Store(StoreError::Backend("down".into())).into();
        assert!(matches!(err, ManagerError::Store(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn transport_accessor() {
        let err: ManagerError = ProtocolError::from(TransportError::InvalidUtf8).into();
        assert_eq!(err.transport(), Some(&TransportError::InvalidUtf8));
        assert!(err.codec().is_none());
    }
}
