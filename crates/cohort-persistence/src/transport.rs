//! Token transport contract
//!
//! The protocol never touches HTTP directly. A request side yields the raw
//! token, a response side accepts the new one. Framing, escaping, expiry and
//! size limits belong to the implementation.

use crate::error::TransportError;
use std::collections::BTreeMap;

/// Read side of a token transport (the inbound request)
pub trait TokenSource {
    /// Read token `name`; `Ok(None)` when the client sent none
    ///
    /// # Errors
    /// Transport failure, including undecodable framing.
    fn read_token(&self, name: &str) -> Result<Option<String>, TransportError>;
}

/// Write side of a token transport (the outbound response)
pub trait TokenSink {
    /// Write token `name`, replacing any earlier write of the same name
    ///
    /// # Errors
    /// Transport failure; nothing is written when an error is returned.
    fn write_token(&mut self, name: &str, token: &str) -> Result<(), TransportError>;
}

impl<T: TokenSource + ?Sized> TokenSource for &T {
    fn read_token(&self, name: &str) -> Result<Option<String>, TransportError> {
        (**self).read_token(name)
    }
}

impl<T: TokenSink + ?Sized> TokenSink for &mut T {
    fn write_token(&mut self, name: &str, token: &str) -> Result<(), TransportError> {
        (**self).write_token(name, token)
    }
}

/// In-memory token jar usable as either side of a round trip
///
/// Use one jar for the request and a fresh one for the response, then
/// [`MemoryTokenJar::next_request`] to carry the writes into the next request
/// the way a browser would.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTokenJar {
    tokens: BTreeMap<String, String>,
    writes: usize,
}

impl MemoryTokenJar {
    /// Create empty jar
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Jar already holding a token
    #[must_use]
    pub fn with_token(name: impl Into<String>, token: impl Into<String>) -> Self {
        let mut jar = Self::new();
        jar.tokens.insert(name.into(), token.into());
        jar
    }

    /// Stored token by name
    #[inline]
    #[must_use]
    pub fn token(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(String::as_str)
    }

    /// Number of writes received
    #[inline]
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Request jar for the next round trip: this jar overlaid with `response`
    #[must_use]
    pub fn next_request(&self, response: &MemoryTokenJar) -> MemoryTokenJar {
        let mut tokens = self.tokens.clone();
        tokens.extend(
            response
                .tokens
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Self { tokens, writes: 0 }
    }
}

impl TokenSource for MemoryTokenJar {
    fn read_token(&self, name: &str) -> Result<Option<String>, TransportError> {
        Ok(self.tokens.get(name).cloned())
    }
}

impl TokenSink for MemoryTokenJar {
    fn write_token(&mut self, name: &str, token: &str) -> Result<(), TransportError> {
        self.tokens.insert(name.to_string(), token.to_string());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_jar_read_absent() {
        let jar = MemoryTokenJar::new();
        assert_eq!(jar.read_token("cohort").unwrap(), None);
    }

    #[test]
    fn memory_jar_write_then_read() {
        let mut jar = MemoryTokenJar::new();
        jar.write_token("cohort", "{}").unwrap();
        assert_eq!(jar.read_token("cohort").unwrap().as_deref(), Some("{}"));
        assert_eq!(jar.writes(), 1);
    }

    #[test]
    fn memory_jar_next_request_overlays_response() {
        let request = MemoryTokenJar::with_token("cohort", "old");
        let mut response = MemoryTokenJar::new();
        response.write_token("cohort", "new").unwrap();

        let next = request.next_request(&response);
        assert_eq!(next.token("cohort"), Some("new"));
        assert_eq!(next.writes(), 0);

        let untouched = request.next_request(&MemoryTokenJar::new());
        assert_eq!(untouched.token("cohort"), Some("old"));
    }
}
