//! Experiment and alternative types
//!
//! [`ExperimentDefinition`] is the unvalidated shape callers and config files
//! provide. [`Experiment`] is only obtainable through validation, so every
//! `Experiment` in circulation satisfies the registration invariants:
//! non-empty key, at least two uniquely named alternatives, weights >= 1.

use crate::error::RegistrationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Suffix appended to an experiment key to mark it finished in client state
pub const FINISHED_SUFFIX: &str = ":finished";

/// Weight assigned to alternatives declared without one
pub const DEFAULT_WEIGHT: u64 = 1;

/// One variant of an experiment with its relative selection weight
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alternative {
    name: String,
    weight: u64,
}

impl Alternative {
    pub(crate) fn new(name: impl Into<String>, weight: u64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }

    /// Alternative name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relative weight (never zero once registered)
    #[inline]
    #[must_use]
    pub fn weight(&self) -> u64 {
        self.weight
    }
}

/// Alternative as declared, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeDefinition {
    /// Alternative name
    pub name: String,
    /// Declared weight; zero means unspecified
    #[serde(default)]
    pub weight: i64,
}

impl AlternativeDefinition {
    /// Alternative with unspecified weight
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: 0,
        }
    }

    /// Alternative with explicit weight
    #[inline]
    pub fn weighted(name: impl Into<String>, weight: i64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Experiment as declared, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    /// Experiment key
    pub key: String,
    /// Declared alternatives, in order
    #[serde(default)]
    pub alternatives: Vec<AlternativeDefinition>,
}

impl ExperimentDefinition {
    /// Validate and normalize into an [`Experiment`]
    ///
    /// # Errors
    /// - `EmptyKey` if the key is empty
    /// - `ReservedSuffix` if the key ends in [`FINISHED_SUFFIX`]
    /// - `TooFewAlternatives` if fewer than two alternatives are declared
    /// - `DuplicateAlternative` if two alternatives share a name
    /// - `NegativeWeight` if any weight is below zero
    pub fn validate(self) -> Result<Experiment, RegistrationError> {
        let Self { key, alternatives } = self;

        if key.is_empty() {
            return Err(RegistrationError::EmptyKey);
        }

        if key.ends_with(FINISHED_SUFFIX) {
            return Err(RegistrationError::ReservedSuffix {
                key,
                suffix: FINISHED_SUFFIX,
            });
        }

        if alternatives.len() < 2 {
            return Err(RegistrationError::TooFewAlternatives {
                key,
                count: alternatives.len(),
            });
        }

        let mut seen = HashSet::with_capacity(alternatives.len());
        for alt in &alternatives {
            if !seen.insert(alt.name.as_str()) {
                return Err(RegistrationError::DuplicateAlternative {
                    name: alt.name.clone(),
                    key,
                });
            }
        }

        let mut normalized = Vec::with_capacity(alternatives.len());
        for alt in alternatives {
            let weight = match u64::try_from(alt.weight) {
                Ok(0) => DEFAULT_WEIGHT,
                Ok(w) => w,
                Err(_) => {
                    return Err(RegistrationError::NegativeWeight {
                        key,
                        name: alt.name,
                        weight: alt.weight,
                    })
                }
            };
            normalized.push(Alternative::new(alt.name, weight));
        }

        Ok(Experiment {
            key,
            alternatives: normalized,
        })
    }
}

impl From<Experiment> for ExperimentDefinition {
    fn from(experiment: Experiment) -> Self {
        Self {
            key: experiment.key,
            alternatives: experiment
                .alternatives
                .into_iter()
                .map(|a| AlternativeDefinition {
                    weight: i64::try_from(a.weight).unwrap_or(i64::MAX),
                    name: a.name,
                })
                .collect(),
        }
    }
}

/// A validated, immutable A/B experiment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ExperimentDefinition", into = "ExperimentDefinition")]
pub struct Experiment {
    key: String,
    alternatives: Vec<Alternative>,
}

impl TryFrom<ExperimentDefinition> for Experiment {
    type Error = RegistrationError;

    fn try_from(definition: ExperimentDefinition) -> Result<Self, Self::Error> {
        definition.validate()
    }
}

impl Experiment {
    /// Start building an experiment
    #[inline]
    pub fn builder(key: impl Into<String>) -> ExperimentBuilder {
        ExperimentBuilder::new(key)
    }

    /// Experiment key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Alternatives in declared order
    #[inline]
    #[must_use]
    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// Name of the first declared alternative
    #[inline]
    #[must_use]
    pub fn first_alternative(&self) -> &str {
        // validation guarantees at least two alternatives
        &self.alternatives[0].name
    }

    /// Find alternative by name
    #[must_use]
    pub fn alternative(&self, name: &str) -> Option<&Alternative> {
        self.alternatives.iter().find(|a| a.name == name)
    }

    /// Sum of all weights
    #[must_use]
    pub fn total_weight(&self) -> u128 {
        self.alternatives.iter().map(|a| u128::from(a.weight)).sum()
    }

    /// Key under which the finish marker is stored
    #[must_use]
    pub fn finished_key(&self) -> String {
        format!("{}{FINISHED_SUFFIX}", self.key)
    }
}

/// Fluent builder producing a validated [`Experiment`]
#[derive(Debug, Clone, Default)]
pub struct ExperimentBuilder {
    definition: ExperimentDefinition,
}

impl ExperimentBuilder {
    /// Create builder for key
    #[inline]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            definition: ExperimentDefinition {
                key: key.into(),
                alternatives: Vec::new(),
            },
        }
    }

    /// Add alternative with unspecified weight
    #[inline]
    #[must_use]
    pub fn alternative(mut self, name: impl Into<String>) -> Self {
        self.definition
            .alternatives
            .push(AlternativeDefinition::new(name));
        self
    }

    /// Add alternative with explicit weight
    #[inline]
    #[must_use]
    pub fn weighted_alternative(mut self, name: impl Into<String>, weight: i64) -> Self {
        self.definition
            .alternatives
            .push(AlternativeDefinition::weighted(name, weight));
        self
    }

    /// Validate and build
    ///
    /// # Errors
    /// See [`ExperimentDefinition::validate`].
    pub fn build(self) -> Result<Experiment, RegistrationError> {
        self.definition.validate()
    }
}
