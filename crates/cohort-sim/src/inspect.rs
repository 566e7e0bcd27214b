//! Token inspection

use crate::error::SimError;
use cohort_experiment::FINISHED_SUFFIX;
use cohort_persistence::cookie::unescape;
use cohort_persistence::{ClientState, StateBlob};
use serde::Serialize;
use std::fmt::Write as _;

/// Derived state of one experiment found in a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectedExperiment {
    /// Experiment key
    pub key: String,
    /// Stored alternative
    pub alternative: String,
    /// Finish marker present
    pub finished: bool,
}

/// Everything readable from one token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inspection {
    /// Experiments with an assignment
    pub experiments: Vec<InspectedExperiment>,
    /// Finish markers whose experiment has no assignment
    pub orphan_markers: Vec<String>,
}

impl Inspection {
    /// Human-readable listing
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut out = String::new();
        if self.experiments.is_empty() {
            out.push_str("no experiments assigned\n");
        }
        for exp in &self.experiments {
            let state = if exp.finished { "finished" } else { "assigned" };
            let _ = writeln!(out, "{:<24} {:<9} {}", exp.key, state, exp.alternative);
        }
        for marker in &self.orphan_markers {
            let _ = writeln!(out, "{marker:<24} orphan finish marker");
        }
        out
    }
}

/// Decode a token; `escaped` values are unescaped first, as sent in a cookie
///
/// # Errors
/// - `Transport` for an invalid escape sequence
/// - `Codec` if the token is not a state blob
pub fn inspect(token: &str, escaped: bool) -> Result<Inspection, SimError> {
    let raw = if escaped {
        unescape(token)?
    } else {
        token.to_string()
    };
    let blob = StateBlob::decode(&raw)?;

    let experiments = blob
        .experiments()
        .filter_map(|(key, state)| match state {
            ClientState::Unassigned => None,
            ClientState::Assigned(alt) => Some(InspectedExperiment {
                key: key.to_string(),
                alternative: alt.to_string(),
                finished: false,
            }),
            ClientState::Finished(alt) => Some(InspectedExperiment {
                key: key.to_string(),
                alternative: alt.to_string(),
                finished: true,
            }),
        })
        .collect();

    let orphan_markers = blob
        .iter()
        .filter_map(|(k, _)| k.strip_suffix(FINISHED_SUFFIX).map(|base| (k, base)))
        .filter(|(_, base)| blob.get(base).is_none())
        .map(|(k, _)| k.to_string())
        .collect();

    Ok(Inspection {
        experiments,
        orphan_markers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn inspect_plain_token() {
        let inspection =
            inspect(r#"{"a":"control","a:finished":"true","b":"variant"}"#, false).unwrap();

        assert_eq!(
            inspection.experiments,
            vec![
                InspectedExperiment {
                    key: "a".to_string(),
                    alternative: "control".to_string(),
                    finished: true,
                },
                InspectedExperiment {
                    key: "b".to_string(),
                    alternative: "variant".to_string(),
                    finished: false,
                },
            ]
        );
        assert!(inspection.orphan_markers.is_empty());
    }

    #[test]
    fn inspect_escaped_token() {
        let inspection = inspect("%7B%22a%22%3A%22control%22%7D", true).unwrap();
        assert_eq!(inspection.experiments.len(), 1);
        assert_eq!(inspection.experiments[0].alternative, "control");
    }

    #[test]
    fn inspect_reports_orphan_markers() {
        let inspection = inspect(r#"{"gone:finished":"true"}"#, false).unwrap();
        assert!(inspection.experiments.is_empty());
        assert_eq!(inspection.orphan_markers, vec!["gone:finished".to_string()]);
        assert!(inspection.generate_text().contains("orphan finish marker"));
    }

    #[test]
    fn inspect_rejects_garbage() {
        assert!(matches!(inspect("nope", false), Err(SimError::Codec(_))));
        assert!(matches!(inspect("%zz", true), Err(SimError::Transport(_))));
    }
}
