//! Inbound request verification: signature check plus replay protection.

use crate::SignatureRequest;
use crate::oauth::error::AuthError;
use crate::oauth::signature::{SignatureEngine, base_string};
use crate::oauth::store::NonceStore;
use std::sync::Arc;

/// Authenticates inbound launch and outcomes requests.
///
/// The verifier is the composition root over the two security-sensitive
/// pieces: it recomputes the expected signature over the request and
/// compares constant-time, then consumes the nonce through the configured
/// [`NonceStore`]. Every failure surfaces a specific [`AuthError`]; there
/// is no error path that accepts a request.
///
/// The HTTP layer is expected to hand over the method, the request URL
/// with the query string already merged into the parameter set, and all
/// form/query parameters including the `oauth_*` ones.
///
/// `RequestVerifier` is `Send + Sync` and is typically shared across
/// request handlers as an `Arc<RequestVerifier>`.
///
/// # Example
///
/// ```rust
/// use lti_auth::{RequestSigner, RequestVerifier, SignatureRequest, store::MemoryNonceStore};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), lti_auth::AuthError> {
/// let signer = RequestSigner::new("consumer_key", "consumer_secret");
/// let launch = signer.sign_request(
///     SignatureRequest::new("POST", "https://tool.example.com/launch")
///         .param("lti_message_type", "basic-lti-launch-request"),
/// )?;
///
/// let verifier = RequestVerifier::new(Arc::new(MemoryNonceStore::new()))
///     .with_consumer_secret("consumer_secret");
/// verifier.verify(&launch).await?;
/// # Ok(())
/// # }
/// ```
pub struct RequestVerifier {
    store: Arc<dyn NonceStore>,
    consumer_secret: Option<String>,
    token_secret: String,
}

impl RequestVerifier {
    /// Creates a verifier backed by the given nonce store.
    ///
    /// A consumer secret must be configured before verification.
    pub fn new(store: Arc<dyn NonceStore>) -> Self {
        Self {
            store,
            consumer_secret: None,
            token_secret: String::new(),
        }
    }

    /// Sets the shared consumer secret.
    ///
    /// An empty string is a legal secret; leaving the secret unset is a
    /// configuration error caught at verification time.
    pub fn with_consumer_secret(mut self, consumer_secret: impl Into<String>) -> Self {
        self.consumer_secret = Some(consumer_secret.into());
        self
    }

    /// Sets the token secret for flows that carry one.
    pub fn with_token_secret(mut self, token_secret: impl Into<String>) -> Self {
        self.token_secret = token_secret.into();
        self
    }

    /// Verifies a request's signature and consumes its nonce.
    ///
    /// # Errors
    ///
    /// * [`AuthError::InvalidConfiguration`] - no consumer secret configured
    /// * [`AuthError::MissingParameter`] - `oauth_signature`, `oauth_nonce`,
    ///   or `oauth_timestamp` absent
    /// * [`AuthError::InvalidSignature`] - signature mismatch
    /// * [`AuthError::Expired`] / [`AuthError::Replayed`] - nonce store
    ///   rejection
    /// * [`AuthError::BackendUnavailable`] - the nonce store could not be
    ///   consulted; the request was neither accepted nor rejected
    pub async fn verify(&self, request: &SignatureRequest) -> Result<(), AuthError> {
        let consumer_secret = self.consumer_secret.as_deref().ok_or_else(|| {
            AuthError::InvalidConfiguration(
                "consumer secret must be set before verification".to_string(),
            )
        })?;

        // The signature itself never participates in the base string.
        let mut provided_signature = None;
        let mut nonce = None;
        let mut timestamp = None;
        let mut signed_params = Vec::with_capacity(request.parameters.len());
        for (key, value) in &request.parameters {
            match key.as_str() {
                "oauth_signature" => provided_signature = Some(value.as_str()),
                _ => {
                    if key == "oauth_nonce" {
                        nonce = Some(value.as_str());
                    } else if key == "oauth_timestamp" {
                        timestamp = value.parse::<u64>().ok();
                    }
                    signed_params.push((key.clone(), value.clone()));
                }
            }
        }
        let provided_signature = provided_signature.ok_or(AuthError::MissingParameter)?;

        let engine =
            SignatureEngine::new(consumer_secret).with_token_secret(self.token_secret.clone());
        let base = base_string(&request.method, &request.url, &signed_params)?;
        if !engine.verify(&base, provided_signature)? {
            tracing::warn!(url = %request.url, "signature mismatch");
            return Err(AuthError::InvalidSignature);
        }

        // Only after the signature holds does the nonce get consumed, so
        // forged requests cannot burn legitimate nonces.
        self.store.is_new(nonce.unwrap_or(""), timestamp).await
    }
}
