//! Outbound request signing for launch requests.

use crate::SignatureRequest;
use crate::oauth::error::AuthError;
use crate::oauth::signature::{SignatureEngine, base_string};
use crate::oauth::time_utils::current_timestamp;

/// Signs outbound requests on behalf of a consumer-key holder.
///
/// Fills the `oauth_*` protocol parameters (consumer key, nonce,
/// timestamp, signature method, version) and computes `oauth_signature`
/// over the completed parameter set. The counterpart platform verifies
/// the result with [`RequestVerifier`](crate::RequestVerifier) and the
/// same shared secret.
///
/// # Example
///
/// ```rust
/// use lti_auth::{RequestSigner, SignatureRequest};
///
/// let signer = RequestSigner::new("consumer_key", "consumer_secret");
/// let request = SignatureRequest::new("POST", "https://tool.example.com/launch")
///     .param("lti_message_type", "basic-lti-launch-request")
///     .param("user_id", "student-42");
///
/// let signed = signer.sign_request(request)?;
/// assert!(signed.parameters.iter().any(|(k, _)| k == "oauth_signature"));
/// # Ok::<(), lti_auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RequestSigner {
    consumer_key: String,
    engine: SignatureEngine,
}

impl RequestSigner {
    /// Creates a signer for the given consumer key and secret.
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            engine: SignatureEngine::new(consumer_secret),
        }
    }

    /// Sets the token secret for flows that carry one.
    pub fn with_token_secret(mut self, token_secret: impl Into<String>) -> Self {
        self.engine = self.engine.with_token_secret(token_secret);
        self
    }

    /// Adds the OAuth protocol parameters and signature to a request.
    ///
    /// A fresh nonce and the current wall-clock timestamp are generated
    /// here; protocol parameters already present in the request are left
    /// alone so callers can pin their own nonce or timestamp (tests do).
    pub fn sign_request(&self, mut request: SignatureRequest) -> Result<SignatureRequest, AuthError> {
        let defaults = [
            ("oauth_consumer_key", self.consumer_key.clone()),
            ("oauth_nonce", generate_nonce()),
            ("oauth_timestamp", current_timestamp()?.to_string()),
            ("oauth_signature_method", "HMAC-SHA1".to_string()),
            ("oauth_version", "1.0".to_string()),
        ];
        for (key, value) in defaults {
            if !request.parameters.iter().any(|(k, _)| k == key) {
                request.parameters.push((key.to_string(), value));
            }
        }

        let base = base_string(&request.method, &request.url, &request.parameters)?;
        let signature = self.engine.sign(&base)?;
        request
            .parameters
            .push(("oauth_signature".to_string(), signature));
        Ok(request)
    }
}

/// Generates a fresh random nonce.
#[cfg(feature = "default-generators")]
pub fn generate_nonce() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generates a fresh nonce from the current time and a process-unique
/// counter. Enable `default-generators` for UUID-based nonces.
#[cfg(not(feature = "default-generators"))]
pub fn generate_nonce() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}-{}-{seq}", std::process::id(), now.as_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_request_fills_protocol_parameters() {
        let signer = RequestSigner::new("key", "secret");
        let signed = signer
            .sign_request(SignatureRequest::new("POST", "https://tool.example.com/launch"))
            .unwrap();

        for expected in [
            "oauth_consumer_key",
            "oauth_nonce",
            "oauth_timestamp",
            "oauth_signature_method",
            "oauth_version",
            "oauth_signature",
        ] {
            assert!(
                signed.parameters.iter().any(|(k, _)| k == expected),
                "missing {expected}"
            );
        }
    }

    #[test]
    fn test_sign_request_respects_pinned_parameters() {
        let signer = RequestSigner::new("key", "secret");
        let request = SignatureRequest::new("POST", "https://tool.example.com/launch")
            .param("oauth_nonce", "pinned-nonce")
            .param("oauth_timestamp", "1318622958");
        let signed = signer.sign_request(request).unwrap();

        let nonces: Vec<_> = signed
            .parameters
            .iter()
            .filter(|(k, _)| k == "oauth_nonce")
            .collect();
        assert_eq!(nonces.len(), 1);
        assert_eq!(nonces[0].1, "pinned-nonce");
    }

    #[test]
    fn test_generated_nonces_are_unique() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }
}
