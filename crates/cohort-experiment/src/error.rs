//! Error types for experiment definitions
//!
//! Registration problems are programmer errors: they are meant to stop
//! startup, not to be retried at request time.

/// Errors raised while validating or registering an experiment
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// Experiment key is empty
    #[error("cannot register experiment with key: ``: the key cannot be empty")]
    EmptyKey,

    /// Key collides with the finish marker of another experiment
    #[error("cannot register experiment with key: `{key}`: keys ending in `{suffix}` are reserved")]
    ReservedSuffix {
        /// Offending key
        key: String,
        /// Reserved suffix
        suffix: &'static str,
    },

    /// Key already present in the registry
    #[error("cannot register experiment with key: `{key}`: each experiment must be registered only once")]
    DuplicateKey {
        /// Offending key
        key: String,
    },

    /// Fewer than two alternatives declared
    #[error("cannot register experiment with key: `{key}`: should have at least 2 alternatives, got {count}")]
    TooFewAlternatives {
        /// Offending key
        key: String,
        /// Number of declared alternatives
        count: usize,
    },

    /// Two alternatives share a name
    #[error("cannot register experiment with key: `{key}`: alternatives must be unique, `{name}` is declared twice")]
    DuplicateAlternative {
        /// Offending key
        key: String,
        /// Repeated alternative name
        name: String,
    },

    /// Alternative declared with a weight below zero
    #[error("cannot register experiment with key: `{key}`: alternative `{name}` has negative weight {weight}")]
    NegativeWeight {
        /// Offending key
        key: String,
        /// Alternative carrying the weight
        name: String,
        /// Declared weight
        weight: i64,
    },
}

impl RegistrationError {
    /// Key of the experiment that failed registration
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::EmptyKey => "",
            Self::ReservedSuffix { key, .. }
            | Self::DuplicateKey { key }
            | Self::TooFewAlternatives { key, .. }
            | Self::DuplicateAlternative { key, .. }
            | Self::NegativeWeight { key, .. } => key,
        }
    }

    /// Create duplicate key error
    #[inline]
    pub fn duplicate(key: impl Into<String>) -> Self {
        Self::DuplicateKey { key: key.into() }
    }
}

/// Errors raised by the weighted selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// Nothing to choose from
    #[error("cannot choose an alternative: no alternatives declared")]
    NoAlternatives,

    /// Every weight is zero
    #[error("cannot choose an alternative: total weight is zero")]
    ZeroTotalWeight,

    /// Walk ended without crossing a boundary
    #[error("cannot choose an alternative: draw fell past total weight {total}")]
    Exhausted {
        /// Sum of all weights
        total: u128,
    },
}
