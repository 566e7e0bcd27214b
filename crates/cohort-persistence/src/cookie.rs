//! HTTP cookie token transport
//!
//! [`CookieRequest`] reads tokens out of a `Cookie` request header and
//! [`CookieResponse`] renders `Set-Cookie` header values. Token values are
//! query-escaped so JSON survives cookie framing; a rendered header longer
//! than [`CookieConfig::max_len`] is refused rather than truncated.

use crate::error::TransportError;
use crate::transport::{TokenSink, TokenSource};
use percent_encoding::{percent_decode, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Bytes escaped in token values: all but alphanumerics and `-_.~`
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Default cookie lifetime: one day
pub const DEFAULT_MAX_AGE_SECS: u64 = 60 * 60 * 24;

/// Default ceiling on a rendered `Set-Cookie` value, including attributes
pub const DEFAULT_MAX_LEN: usize = 4096;

/// `SameSite` cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// Sent on top-level navigations
    #[default]
    Lax,
    /// Never sent cross-site
    Strict,
    /// Always sent (requires `Secure`)
    None,
}

impl SameSite {
    /// Attribute value
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lax => "Lax",
            Self::Strict => "Strict",
            Self::None => "None",
        }
    }
}

/// Cookie attributes applied to every written token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    /// `Path` attribute
    pub path: String,
    /// `Domain` attribute, omitted when `None`
    pub domain: Option<String>,
    /// `Max-Age` in seconds; `None` or zero omits the attribute
    pub max_age_secs: Option<u64>,
    /// Hide from scripts
    pub http_only: bool,
    /// HTTPS only
    pub secure: bool,
    /// Cross-site policy
    pub same_site: SameSite,
    /// Ceiling on the rendered header value
    pub max_len: usize,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age_secs: Some(DEFAULT_MAX_AGE_SECS),
            http_only: true,
            secure: true,
            same_site: SameSite::Lax,
            max_len: DEFAULT_MAX_LEN,
        }
    }
}

impl CookieConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max age
    #[inline]
    #[must_use]
    pub fn with_max_age(mut self, secs: u64) -> Self {
        self.max_age_secs = Some(secs);
        self
    }

    /// Without `Max-Age`, making a session cookie
    #[inline]
    #[must_use]
    pub fn without_max_age(mut self) -> Self {
        self.max_age_secs = None;
        self
    }

    /// With domain
    #[inline]
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// With secure flag
    #[inline]
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// With length ceiling
    #[inline]
    #[must_use]
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Render a `Set-Cookie` value for an unescaped token
    ///
    /// # Errors
    /// - `InvalidName` if `name` is not a valid cookie name
    /// - `TooLong` if the rendered value exceeds `max_len`
    pub fn render(&self, name: &str, token: &str) -> Result<String, TransportError> {
        check_name(name)?;
        let mut header = format!("{name}={}; Path={}", escape(token), self.path);
        if let Some(secs) = self.max_age_secs.filter(|&secs| secs > 0) {
            header.push_str("; Max-Age=");
            header.push_str(&secs.to_string());
        }
        if let Some(domain) = &self.domain {
            header.push_str("; Domain=");
            header.push_str(domain);
        }
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        if self.secure {
            header.push_str("; Secure");
        }
        header.push_str("; SameSite=");
        header.push_str(self.same_site.as_str());

        if header.len() > self.max_len {
            return Err(TransportError::TooLong {
                len: header.len(),
                limit: self.max_len,
            });
        }
        Ok(header)
    }
}

/// Inbound cookies parsed from a `Cookie` header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieRequest {
    pairs: Vec<(String, String)>,
}

impl CookieRequest {
    /// Request carrying no cookies
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a `Cookie` header value (`a=1; b=2`)
    ///
    /// Segments without `=` are skipped; surrounding double quotes on a value
    /// are stripped. Values stay escaped until read.
    #[must_use]
    pub fn parse(header: &str) -> Self {
        let pairs = header
            .split(';')
            .filter_map(|segment| {
                let (name, value) = segment.trim().split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                Some((name.to_string(), value.to_string()))
            })
            .collect();
        Self { pairs }
    }

    /// Number of cookies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check if no cookies were sent
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl TokenSource for CookieRequest {
    fn read_token(&self, name: &str) -> Result<Option<String>, TransportError> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| unescape(value))
            .transpose()
    }
}

/// Outbound `Set-Cookie` values
#[derive(Debug, Clone, Default)]
pub struct CookieResponse {
    config: CookieConfig,
    set_cookies: Vec<(String, String)>,
}

impl CookieResponse {
    /// Create response applying `config` to every write
    #[inline]
    #[must_use]
    pub fn new(config: CookieConfig) -> Self {
        Self {
            config,
            set_cookies: Vec::new(),
        }
    }

    /// Rendered `Set-Cookie` header values, one per written token
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.set_cookies.iter().map(|(_, header)| header.as_str())
    }

    /// Rendered header for token `name`
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.set_cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, header)| header.as_str())
    }

    /// Request a browser would send back after receiving this response
    #[must_use]
    pub fn to_request(&self) -> CookieRequest {
        let cookie_header = self
            .headers()
            .filter_map(|h| h.split(';').next())
            .collect::<Vec<_>>()
            .join("; ");
        CookieRequest::parse(&cookie_header)
    }
}

impl TokenSink for CookieResponse {
    fn write_token(&mut self, name: &str, token: &str) -> Result<(), TransportError> {
        let header = self.config.render(name, token)?;
        match self.set_cookies.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = header,
            None => self.set_cookies.push((name.to_string(), header)),
        }
        Ok(())
    }
}

/// Check that `name` is an RFC 6265 cookie name
///
/// # Errors
/// `InvalidName` for an empty name, or one holding control, space or separator bytes.
pub fn check_name(name: &str) -> Result<(), TransportError> {
    const SEPARATORS: &[u8] = b"()<>@,;:\\\"/[]?={}";

    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && !SEPARATORS.contains(&b));
    if valid {
        Ok(())
    } else {
        Err(TransportError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Query-escape: unreserved bytes pass through, space becomes `+`, all else `%XX`
#[must_use]
pub fn escape(value: &str) -> String {
    // `%20` only appears where a space was encoded; a literal `%` becomes `%25`
    utf8_percent_encode(value, QUERY).to_string().replace("%20", "+")
}

/// Reverse of [`escape`]
///
/// # Errors
/// - `InvalidEscape` for a truncated or non-hex `%` sequence
/// - `InvalidUtf8` if the decoded bytes are not UTF-8
pub fn unescape(value: &str) -> Result<String, TransportError> {
    let bytes = value.as_bytes();
    if let Some(position) = (0..bytes.len()).find(|&i| {
        bytes[i] == b'%'
            && !bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    }) {
        return Err(TransportError::InvalidEscape { position });
    }

    let spaced: Vec<u8> = bytes
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&spaced)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| TransportError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn render_default_attributes() {
        let header = CookieConfig::default().render("cohort", "{}").unwrap();
        assert_eq!(
            header,
            "cohort=%7B%7D; Path=/; Max-Age=86400; HttpOnly; Secure; SameSite=Lax"
        );
    }

    #[test]
    fn render_with_domain_and_insecure() {
        let config = CookieConfig::new()
            .with_domain("example.com")
            .with_secure(false)
            .with_max_age(60);
        let header = config.render("c", "v").unwrap();
        assert_eq!(
            header,
            "c=v; Path=/; Max-Age=60; Domain=example.com; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn render_omits_unset_or_zero_max_age() {
        for config in [
            CookieConfig::new().without_max_age(),
            CookieConfig::new().with_max_age(0),
        ] {
            assert_eq!(
                config.render("c", "v").unwrap(),
                "c=v; Path=/; HttpOnly; Secure; SameSite=Lax"
            );
        }
    }

    #[test]
    fn render_rejects_bad_names() {
        for name in ["", "a;b", "x=y", "sp ace", "tab\t", "quo\"te", "caf\u{e9}"] {
            let err = CookieConfig::default().render(name, "{}").unwrap_err();
            assert_eq!(
                err,
                TransportError::InvalidName {
                    name: name.to_string()
                }
            );
        }
        assert!(check_name("cohort_v2-ab.x").is_ok());
    }

    #[test]
    fn rejected_name_writes_nothing() {
        let mut response = CookieResponse::new(CookieConfig::default());
        assert!(response.write_token("a;b", "{}").is_err());
        assert_eq!(response.headers().count(), 0);
    }

    #[test]
    fn unescape_rejects_non_hex() {
        assert_eq!(
            unescape("ok%2Gno"),
            Err(TransportError::InvalidEscape { position: 2 })
        );
        assert_eq!(unescape("%E9"), Err(TransportError::InvalidUtf8));
        assert_eq!(unescape("a%2Bb+c").unwrap(), "a+b c");
    }

    #[test]
    fn render_rejects_oversized() {
        let token = "x".repeat(DEFAULT_MAX_LEN);
        let err = CookieConfig::default().render("cohort", &token).unwrap_err();
        assert!(matches!(err, TransportError::TooLong { limit: 4096, .. }));
    }

    #[test]
    fn response_refuses_oversized_write() {
        let mut response = CookieResponse::new(CookieConfig::default().with_max_len(64));
        let token = "y".repeat(100);
        assert!(response.write_token("cohort", &token).is_err());
        assert_eq!(response.headers().count(), 0);
    }

    #[test]
    fn response_replaces_same_name() {
        let mut response = CookieResponse::new(CookieConfig::default());
        response.write_token("cohort", "one").unwrap();
        response.write_token("cohort", "two").unwrap();
        assert_eq!(response.headers().count(), 1);
        assert!(response.header("cohort").unwrap().starts_with("cohort=two;"));
    }

    #[test]
    fn request_parse_multiple_cookies() {
        let request = CookieRequest::parse("session=abc; cohort=%7B%7D ; flag; theme=\"dark\"");
        assert_eq!(request.len(), 3);
        assert_eq!(request.read_token("cohort").unwrap().as_deref(), Some("{}"));
        assert_eq!(request.read_token("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(request.read_token("missing").unwrap(), None);
    }

    #[test]
    fn request_reports_bad_escape() {
        let request = CookieRequest::parse("cohort=%7");
        assert_eq!(
            request.read_token("cohort"),
            Err(TransportError::InvalidEscape { position: 0 })
        );
    }

    #[test]
    fn response_to_request_round_trip() {
        let mut response = CookieResponse::new(CookieConfig::default());
        response
            .write_token("cohort", r#"{"exp":"control"}"#)
            .unwrap();

        let request = response.to_request();
        assert_eq!(
            request.read_token("cohort").unwrap().as_deref(),
            Some(r#"{"exp":"control"}"#)
        );
    }

    #[test]
    fn escape_matches_query_escaping() {
        assert_eq!(escape(r#"{"a b":"c"}"#), "%7B%22a+b%22%3A%22c%22%7D");
        assert_eq!(unescape("%7B%22a+b%22%3A%22c%22%7D").unwrap(), r#"{"a b":"c"}"#);
    }

    proptest! {
        #[test]
        fn prop_escaped_value_is_cookie_safe(value in ".{0,64}") {
            let escaped = escape(&value);
            prop_assert!(!escaped.contains(';'));
            prop_assert!(!escaped.contains('"'));
            prop_assert!(!escaped.contains(','));
            prop_assert!(!escaped.contains(' '));
            prop_assert_eq!(unescape(&escaped).unwrap(), value);
        }
    }
}
