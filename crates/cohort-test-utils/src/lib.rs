//! Testing utilities for the Cohort workspace
//!
//! Shared fixtures, fake transports and a browser-like client session.

#![allow(missing_docs)]

use cohort_experiment::Experiment;
use cohort_persistence::{MemoryTokenJar, StateBlob, TokenSink, TokenSource, TransportError};

pub fn two_way_experiment(key: &str) -> Experiment {
    Experiment::builder(key)
        .alternative("control")
        .alternative("variant")
        .build()
        .unwrap()
}

pub fn weighted_experiment(key: &str, alternatives: &[(&str, i64)]) -> Experiment {
    alternatives
        .iter()
        .fold(Experiment::builder(key), |builder, (name, weight)| {
            builder.weighted_alternative(*name, *weight)
        })
        .build()
        .unwrap()
}

pub fn decode_blob(token: &str) -> StateBlob {
    StateBlob::decode(token).unwrap()
}

/// One client's token jar, carried from response to request like a browser
#[derive(Debug, Clone, Default)]
pub struct ClientSession {
    jar: MemoryTokenJar,
}

impl ClientSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(name: &str, token: &str) -> Self {
        Self {
            jar: MemoryTokenJar::with_token(name, token),
        }
    }

    /// Run one request; whatever `handle` writes is sent on the next one
    pub fn request<T>(&mut self, handle: impl FnOnce(&MemoryTokenJar, &mut MemoryTokenJar) -> T) -> T {
        let mut response = MemoryTokenJar::new();
        let out = handle(&self.jar, &mut response);
        self.jar = self.jar.next_request(&response);
        out
    }

    pub fn token(&self, name: &str) -> Option<&str> {
        self.jar.token(name)
    }

    pub fn blob(&self, name: &str) -> StateBlob {
        self.token(name).map(decode_blob).unwrap_or_default()
    }
}

/// Sink that refuses every write
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSink;

impl TokenSink for FailingSink {
    fn write_token(&mut self, _name: &str, _token: &str) -> Result<(), TransportError> {
        Err(TransportError::Backend("sink closed".to_string()))
    }
}

/// Source that fails every read
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSource;

impl TokenSource for FailingSource {
    fn read_token(&self, _name: &str) -> Result<Option<String>, TransportError> {
        Err(TransportError::Backend("source unavailable".to_string()))
    }
}
