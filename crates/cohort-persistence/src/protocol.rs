//! Start/finish state machine over the client token
//!
//! Per (client, experiment) the state is derived from the freshly read blob:
//!
//! | State      | Start                          | Finish                           |
//! |------------|--------------------------------|----------------------------------|
//! | Unassigned | draw, merge, write; first time | report first alternative, no-op  |
//! | Assigned   | rewrite same token             | mark finished, write; first time |
//! | Finished   | rewrite same token             | no-op                            |
//!
//! The token is written last: when any step fails, nothing is written.

use crate::blob::{ClientState, StateBlob};
use crate::error::ProtocolError;
use crate::response::{FinishExperimentResponse, StartExperimentResponse};
use crate::transport::{TokenSink, TokenSource};
use cohort_experiment::{Experiment, SelectionError};

/// Default token name
pub const DEFAULT_TOKEN_NAME: &str = "cohort";

/// Persistence protocol bound to one token name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceProtocol {
    token_name: String,
}

impl Default for PersistenceProtocol {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_NAME)
    }
}

impl PersistenceProtocol {
    /// Create protocol reading and writing `token_name`
    #[inline]
    pub fn new(token_name: impl Into<String>) -> Self {
        Self {
            token_name: token_name.into(),
        }
    }

    /// Token name
    #[inline]
    #[must_use]
    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    /// Read and decode the current blob; `Ok(None)` when no token was sent
    ///
    /// # Errors
    /// Transport failure or malformed token.
    pub fn read_blob<Src>(&self, source: &Src) -> Result<Option<(String, StateBlob)>, ProtocolError>
    where
        Src: TokenSource + ?Sized,
    {
        let Some(raw) = source.read_token(&self.token_name)? else {
            return Ok(None);
        };
        match StateBlob::decode(&raw) {
            Ok(blob) => Ok(Some((raw, blob))),
            Err(e) => {
                tracing::warn!(token = %self.token_name, error = %e, "rejecting malformed state token");
                Err(e.into())
            }
        }
    }

    /// Start `experiment` for the client behind `source`/`sink`
    ///
    /// `draw` is called only when the client has no assignment yet.
    ///
    /// # Errors
    /// - `Transport` if the token cannot be read or written
    /// - `Codec` if the token is malformed
    /// - `Selection` if `draw` fails
    pub fn start<Src, Snk, F>(
        &self,
        experiment: &Experiment,
        source: &Src,
        sink: &mut Snk,
        draw: F,
    ) -> Result<StartExperimentResponse, ProtocolError>
    where
        Src: TokenSource + ?Sized,
        Snk: TokenSink + ?Sized,
        F: FnOnce(&Experiment) -> Result<String, SelectionError>,
    {
        let key = experiment.key();
        let (raw, mut blob) = self.read_blob(source)?.unwrap_or_default();

        if let Some(stored) = blob.state_of(key).alternative() {
            let alternative = stored.to_string();
            self.write(sink, &raw)?;
            tracing::debug!(key, alternative = %alternative, "resumed experiment");
            return Ok(StartExperimentResponse::resumed(alternative));
        }

        let alternative = draw(experiment)?;
        blob.merge_assign(key, &alternative);
        let encoded = blob.encode()?;
        self.write(sink, &encoded)?;

        tracing::info!(key, alternative = %alternative, "started experiment");
        Ok(StartExperimentResponse::first_time(alternative))
    }

    /// Finish `experiment` for the client behind `source`/`sink`
    ///
    /// # Errors
    /// - `Transport` if the token cannot be read or written
    /// - `Codec` if the token is malformed
    pub fn finish<Src, Snk>(
        &self,
        experiment: &Experiment,
        source: &Src,
        sink: &mut Snk,
    ) -> Result<FinishExperimentResponse, ProtocolError>
    where
        Src: TokenSource + ?Sized,
        Snk: TokenSink + ?Sized,
    {
        let key = experiment.key();
        let Some((_, mut blob)) = self.read_blob(source)? else {
            tracing::debug!(key, "finish without token");
            return Ok(FinishExperimentResponse::not_started(
                experiment.first_alternative(),
            ));
        };

        let alternative = match blob.state_of(key) {
            ClientState::Unassigned => {
                tracing::debug!(key, "finish without assignment");
                return Ok(FinishExperimentResponse::not_started(
                    experiment.first_alternative(),
                ));
            }
            ClientState::Finished(alt) => {
                tracing::debug!(key, alternative = alt, "experiment already finished");
                return Ok(FinishExperimentResponse::already_finished(alt));
            }
            ClientState::Assigned(alt) => alt.to_string(),
        };

        let already = blob.merge_finish(key);
        let encoded = blob.encode()?;
        self.write(sink, &encoded)?;

        tracing::info!(key, alternative = %alternative, "finished experiment");
        if already {
            Ok(FinishExperimentResponse::already_finished(alternative))
        } else {
            Ok(FinishExperimentResponse::first_time(alternative))
        }
    }

    fn write<Snk: TokenSink + ?Sized>(&self, sink: &mut Snk, token: &str) -> Result<(), ProtocolError> {
        sink.write_token(&self.token_name, token).map_err(|e| {
            tracing::warn!(token = %self.token_name, error = %e, "failed to write state token");
            ProtocolError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CodecError, TransportError};
    use crate::transport::MemoryTokenJar;
    use pretty_assertions::assert_eq;

    fn experiment(key: &str) -> Experiment {
        Experiment::builder(key)
            .alternative("A")
            .alternative("B")
            .build()
            .unwrap()
    }

    fn always(name: &'static str) -> impl FnOnce(&Experiment) -> Result<String, SelectionError> {
        move |_: &Experiment| -> Result<String, SelectionError> { Ok(name.to_string()) }
    }

    fn never() -> impl FnOnce(&Experiment) -> Result<String, SelectionError> {
        |_: &Experiment| -> Result<String, SelectionError> {
            panic!("draw must not run for an assigned client")
        }
    }

    struct FailingSink;

    impl TokenSink for FailingSink {
        fn write_token(&mut self, _name: &str, _token: &str) -> Result<(), TransportError> {
            Err(TransportError::Backend("closed".to_string()))
        }
    }

    #[test]
    fn start_without_token_assigns() {
        let protocol = PersistenceProtocol::default();
        let request = MemoryTokenJar::new();
        let mut response = MemoryTokenJar::new();

        let res = protocol
            .start(&experiment("t1"), &request, &mut response, always("B"))
            .unwrap();

        assert_eq!(res, StartExperimentResponse::first_time("B"));
        assert_eq!(response.token("cohort"), Some(r#"{"t1":"B"}"#));
    }

    #[test]
    fn start_twice_resumes_and_rewrites_same_token() {
        let protocol = PersistenceProtocol::default();
        let request = MemoryTokenJar::with_token("cohort", r#"{"t1":"A"}"#);
        let mut response = MemoryTokenJar::new();

        let res = protocol
            .start(&experiment("t1"), &request, &mut response, never())
            .unwrap();

        assert_eq!(res, StartExperimentResponse::resumed("A"));
        assert_eq!(response.token("cohort"), Some(r#"{"t1":"A"}"#));
        assert_eq!(response.writes(), 1);
    }

    #[test]
    fn start_after_finish_resumes() {
        let protocol = PersistenceProtocol::default();
        let token = r#"{"t1":"B","t1:finished":"true"}"#;
        let request = MemoryTokenJar::with_token("cohort", token);
        let mut response = MemoryTokenJar::new();

        let res = protocol
            .start(&experiment("t1"), &request, &mut response, never())
            .unwrap();

        assert_eq!(res, StartExperimentResponse::resumed("B"));
        assert_eq!(response.token("cohort"), Some(token));
    }

    #[test]
    fn start_merges_into_existing_blob() {
        let protocol = PersistenceProtocol::default();
        let request = MemoryTokenJar::with_token("cohort", r#"{"other":"x","other:finished":"true"}"#);
        let mut response = MemoryTokenJar::new();

        protocol
            .start(&experiment("t1"), &request, &mut response, always("A"))
            .unwrap();

        let blob = StateBlob::decode(response.token("cohort").unwrap()).unwrap();
        assert_eq!(blob.state_of("other"), ClientState::Finished("x"));
        assert_eq!(blob.state_of("t1"), ClientState::Assigned("A"));
    }

    #[test]
    fn start_with_malformed_token_fails_without_write() {
        let protocol = PersistenceProtocol::default();
        let request = MemoryTokenJar::with_token("cohort", "not-json");
        let mut response = MemoryTokenJar::new();

        let err = protocol
            .start(&experiment("t1"), &request, &mut response, always("A"))
            .unwrap_err();

        assert!(matches!(err, ProtocolError::Codec(CodecError::Malformed(_))));
        assert_eq!(response.writes(), 0);
    }

    #[test]
    fn start_propagates_selection_failure() {
        let protocol = PersistenceProtocol::default();
        let mut response = MemoryTokenJar::new();

        let err = protocol
            .start(&experiment("t1"), &MemoryTokenJar::new(), &mut response, |_| {
                Err(SelectionError::ZeroTotalWeight)
            })
            .unwrap_err();

        assert!(matches!(err, ProtocolError::Selection(_)));
        assert_eq!(response.writes(), 0);
    }

    #[test]
    fn start_propagates_write_failure() {
        let protocol = PersistenceProtocol::default();
        let err = protocol
            .start(&experiment("t1"), &MemoryTokenJar::new(), &mut FailingSink, always("A"))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Transport(TransportError::Backend(_))));
    }

    #[test]
    fn finish_without_token_reports_first() {
        let protocol = PersistenceProtocol::default();
        let mut response = MemoryTokenJar::new();

        let res = protocol
            .finish(&experiment("t1"), &MemoryTokenJar::new(), &mut response)
            .unwrap();

        assert_eq!(res, FinishExperimentResponse::not_started("A"));
        assert_eq!(response.writes(), 0);
    }

    #[test]
    fn finish_unassigned_with_sibling_state_reports_first() {
        let protocol = PersistenceProtocol::default();
        let request = MemoryTokenJar::with_token("cohort", r#"{"other":"x"}"#);
        let mut response = MemoryTokenJar::new();

        let res = protocol
            .finish(&experiment("t1"), &request, &mut response)
            .unwrap();

        assert_eq!(res, FinishExperimentResponse::not_started("A"));
        assert_eq!(response.writes(), 0);
    }

    #[test]
    fn finish_assigned_marks_finished() {
        let protocol = PersistenceProtocol::default();
        let request = MemoryTokenJar::with_token("cohort", r#"{"other":"x","t1":"B"}"#);
        let mut response = MemoryTokenJar::new();

        let res = protocol
            .finish(&experiment("t1"), &request, &mut response)
            .unwrap();

        assert_eq!(res, FinishExperimentResponse::first_time("B"));
        assert_eq!(
            response.token("cohort"),
            Some(r#"{"other":"x","t1":"B","t1:finished":"true"}"#)
        );
    }

    #[test]
    fn finish_finished_is_noop() {
        let protocol = PersistenceProtocol::default();
        let request = MemoryTokenJar::with_token("cohort", r#"{"t1":"B","t1:finished":"true"}"#);
        let mut response = MemoryTokenJar::new();

        let res = protocol
            .finish(&experiment("t1"), &request, &mut response)
            .unwrap();

        assert_eq!(res, FinishExperimentResponse::already_finished("B"));
        assert_eq!(response.writes(), 0);
    }

    #[test]
    fn custom_token_name() {
        let protocol = PersistenceProtocol::new("ab");
        let mut response = MemoryTokenJar::new();

        protocol
            .start(&experiment("t1"), &MemoryTokenJar::new(), &mut response, always("A"))
            .unwrap();

        assert_eq!(protocol.token_name(), "ab");
        assert!(response.token("ab").is_some());
        assert!(response.token("cohort").is_none());
    }
}
