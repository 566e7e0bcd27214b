//! Per-client state blob
//!
//! One blob holds every experiment's state for a client, as a flat map:
//!
//! ```text
//! {"checkout": "control", "checkout:finished": "true", "signup": "variant"}
//! ```
//!
//! Merges touch only the entries of the experiment being updated.

use crate::error::CodecError;
use cohort_experiment::FINISHED_SUFFIX;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value written for the finish marker; only its presence is significant
pub const FINISHED_VALUE: &str = "true";

/// State of one experiment for one client, derived from blob contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState<'a> {
    /// No alternative stored
    Unassigned,
    /// Alternative stored, not finished
    Assigned(&'a str),
    /// Alternative stored and finish marker present
    Finished(&'a str),
}

impl<'a> ClientState<'a> {
    /// Stored alternative, if any
    #[inline]
    #[must_use]
    pub fn alternative(&self) -> Option<&'a str> {
        match *self {
            Self::Unassigned => None,
            Self::Assigned(alt) | Self::Finished(alt) => Some(alt),
        }
    }
}

/// Flat string-to-string map persisted in the client token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateBlob {
    entries: BTreeMap<String, String>,
}

impl StateBlob {
    /// Create empty blob
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a token
    ///
    /// # Errors
    /// `CodecError::Malformed` unless the token is a JSON object whose values
    /// are all strings.
    pub fn decode(token: &str) -> Result<Self, CodecError> {
        serde_json::from_str(token).map_err(CodecError::Malformed)
    }

    /// Serialize to a token; keys are emitted in sorted order
    ///
    /// # Errors
    /// `CodecError::Encode` if serialization fails.
    pub fn encode(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(CodecError::Encode)
    }

    /// Derived state of experiment `key`
    #[must_use]
    pub fn state_of(&self, key: &str) -> ClientState<'_> {
        match self.entries.get(key) {
            None => ClientState::Unassigned,
            Some(alt) if self.entries.contains_key(&finished_key(key)) => {
                ClientState::Finished(alt)
            }
            Some(alt) => ClientState::Assigned(alt),
        }
    }

    /// Store `alternative` for `key`, leaving every other entry untouched
    pub fn merge_assign(&mut self, key: &str, alternative: &str) {
        self.entries.insert(key.to_string(), alternative.to_string());
    }

    /// Set the finish marker for `key`, leaving every other entry untouched
    ///
    /// Returns whether the marker was already present.
    pub fn merge_finish(&mut self, key: &str) -> bool {
        self.entries
            .insert(finished_key(key), FINISHED_VALUE.to_string())
            .is_some()
    }

    /// Raw entry lookup
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of raw entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if blob is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate raw entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Experiments with an assignment, with their derived state
    pub fn experiments(&self) -> impl Iterator<Item = (&str, ClientState<'_>)> {
        self.entries
            .keys()
            .filter(|k| !k.ends_with(FINISHED_SUFFIX))
            .map(move |k| (k.as_str(), self.state_of(k)))
    }
}

impl FromIterator<(String, String)> for StateBlob {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn finished_key(key: &str) -> String {
    format!("{key}{FINISHED_SUFFIX}")
}
