use thiserror::Error;

/// Error types produced while authenticating LTI requests.
///
/// The first four variants are authentication *outcomes*: the request was
/// examined and rejected, and retrying the same request will never succeed.
/// `BackendUnavailable` is different in kind — it means the nonce store
/// could not be consulted at all, so the caller knows the request was
/// neither verified nor rejected and may retry against a healthy backend.
///
/// No error path ever falls back to accepting a request.
///
/// # Example
///
/// ```rust
/// use lti_auth::{AuthError, RequestVerifier, SignatureRequest, store::MemoryNonceStore};
/// use std::sync::Arc;
///
/// # async fn example() {
/// let verifier = RequestVerifier::new(Arc::new(MemoryNonceStore::new()))
///     .with_consumer_secret("secret");
/// let request = SignatureRequest::new("POST", "https://tool.example.com/launch");
///
/// match verifier.verify(&request).await {
///     Ok(()) => println!("launch accepted"),
///     Err(AuthError::Replayed) => println!("nonce already consumed"),
///     Err(AuthError::Expired) => println!("stale timestamp"),
///     Err(AuthError::BackendUnavailable(_)) => println!("could not verify, retryable"),
///     Err(e) => println!("rejected: {e}"),
/// }
/// # }
/// ```
#[derive(Error, Debug)]
pub enum AuthError {
    /// A required protocol parameter (nonce, timestamp, or signature) is
    /// absent or empty. Always rejects; the client must resend a complete
    /// request.
    #[error("Missing required parameter")]
    MissingParameter,

    /// The request timestamp is older than the replay window (or, when a
    /// future-skew bound is configured, too far ahead of the store's
    /// clock). The client must obtain a fresh timestamp and nonce.
    #[error("Timestamp outside replay window")]
    Expired,

    /// The nonce was already consumed within the replay window.
    ///
    /// This is the primary replay-attack signal. Repeated occurrences for
    /// the same consumer are worth flagging as a potential incident.
    #[error("Nonce already used")]
    Replayed,

    /// The provided `oauth_signature` does not match the signature
    /// recomputed from the request and the shared secret.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Caller-side misuse, such as verifying without configuring a consumer
    /// secret or supplying a URL that cannot be parsed. This is a fatal
    /// programming error, not a runtime condition.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The external nonce store could not be reached within its timeout.
    ///
    /// Retryable infrastructure failure; deliberately distinct from the
    /// authentication outcomes above so callers never conflate "could not
    /// verify" with "verified and rejected".
    #[error("Nonce store unavailable: {0}")]
    BackendUnavailable(String),

    /// The system clock reported a time before the Unix epoch.
    #[error("System clock error: {0}")]
    Clock(String),
}

impl AuthError {
    /// Wraps a backend-specific failure message in `BackendUnavailable`.
    pub fn from_store_message(message: impl Into<String>) -> Self {
        AuthError::BackendUnavailable(message.into())
    }
}
