//! OAuth 1.0a signature base-string construction and HMAC-SHA1 signing.
//!
//! Everything in this module is a pure function of its inputs: the base
//! string depends only on `(method, url, parameters)`, and signing adds
//! only the two secrets. No mutable state is read, so signing is
//! referentially transparent and safely callable from any number of
//! request-handling tasks without coordination.

use crate::oauth::error::AuthError;
use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

/// Everything except the RFC 3986 unreserved characters
/// (ALPHA / DIGIT / "-" / "." / "_" / "~") is percent-encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes a string per the OAuth 1.0a rules.
///
/// Multi-byte characters are encoded UTF-8 byte-wise with upper-hex
/// `%XX` escapes.
pub fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Normalizes a request URL for the signature base string.
///
/// Lower-cases the scheme and host, strips default ports (80 for http,
/// 443 for https), and drops the query string and fragment. Query
/// parameters must be merged into the parameter set by the caller before
/// building the base string; this function never parses the query itself.
fn normalize_url(raw: &str) -> Result<String, AuthError> {
    let url = Url::parse(raw)
        .map_err(|e| AuthError::InvalidConfiguration(format!("unparseable request URL: {e}")))?;

    // Url already lower-cases scheme and host and reports default ports
    // as absent.
    let host = url
        .host_str()
        .ok_or_else(|| AuthError::InvalidConfiguration("request URL has no host".to_string()))?;

    let mut normalized = String::with_capacity(raw.len());
    normalized.push_str(url.scheme());
    normalized.push_str("://");
    normalized.push_str(host);
    if let Some(port) = url.port() {
        normalized.push(':');
        normalized.push_str(&port.to_string());
    }
    normalized.push_str(url.path());
    Ok(normalized)
}

/// Builds the canonical OAuth 1.0a signature base string.
///
/// The method is upper-cased, the URL normalized, and every
/// `key=value` pair percent-encoded and sorted byte-wise by encoded key
/// with ties broken by encoded value. Multi-valued parameters contribute
/// one pair per value.
///
/// # Example
///
/// ```rust
/// let params = vec![
///     ("oauth_nonce".to_string(), "abc123".to_string()),
///     ("lti_message_type".to_string(), "basic-lti-launch-request".to_string()),
/// ];
/// let base = lti_auth::base_string("post", "https://tool.example.com/launch", &params)?;
/// assert!(base.starts_with("POST&https%3A%2F%2Ftool.example.com%2Flaunch&"));
/// # Ok::<(), lti_auth::AuthError>(())
/// ```
pub fn base_string(
    method: &str,
    url: &str,
    parameters: &[(String, String)],
) -> Result<String, AuthError> {
    let normalized_url = normalize_url(url)?;

    let mut pairs: Vec<(String, String)> = parameters
        .iter()
        .map(|(key, value)| (percent_encode(key), percent_encode(value)))
        .collect();
    // Byte-wise on the encoded forms; the tuple ordering gives the
    // value tie-break for repeated keys.
    pairs.sort();

    let param_string = pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    Ok(format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&normalized_url),
        percent_encode(&param_string)
    ))
}

/// HMAC-SHA1 signer/verifier over a signature base string.
///
/// Holds the consumer secret and optional token secret; both may be empty
/// strings, which OAuth permits. The signing key is
/// `enc(consumer_secret) & enc(token_secret)`.
///
/// # Example
///
/// ```rust
/// use lti_auth::SignatureEngine;
///
/// let engine = SignatureEngine::new("consumer_secret");
/// let base = lti_auth::base_string("POST", "https://tool.example.com/launch", &[])?;
/// let signature = engine.sign(&base)?;
/// assert!(engine.verify(&base, &signature)?);
/// # Ok::<(), lti_auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SignatureEngine {
    consumer_secret: String,
    token_secret: String,
}

impl SignatureEngine {
    /// Creates an engine for the given consumer secret and no token secret.
    pub fn new(consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_secret: consumer_secret.into(),
            token_secret: String::new(),
        }
    }

    /// Sets the token secret used as the second half of the signing key.
    pub fn with_token_secret(mut self, token_secret: impl Into<String>) -> Self {
        self.token_secret = token_secret.into();
        self
    }

    fn create_mac(&self) -> Result<HmacSha1, AuthError> {
        let key = format!(
            "{}&{}",
            percent_encode(&self.consumer_secret),
            percent_encode(&self.token_secret)
        );
        HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| AuthError::InvalidConfiguration(format!("invalid HMAC key: {e}")))
    }

    /// Signs a base string, returning the standard-base64 HMAC-SHA1 tag.
    pub fn sign(&self, base_string: &str) -> Result<String, AuthError> {
        let mut mac = self.create_mac()?;
        mac.update(base_string.as_bytes());
        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Verifies a provided signature against a base string.
    ///
    /// The comparison is constant-time over the recomputed tag; length
    /// mismatches and malformed base64 are simply "no match", never an
    /// error — verification is total over string inputs.
    pub fn verify(&self, base_string: &str, provided: &str) -> Result<bool, AuthError> {
        let Ok(provided_bytes) = base64::engine::general_purpose::STANDARD.decode(provided) else {
            return Ok(false);
        };
        let mut mac = self.create_mac()?;
        mac.update(base_string.as_bytes());
        Ok(mac.verify_slice(&provided_bytes).is_ok())
    }
}
