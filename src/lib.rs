//! # LTI Auth
//!
//! OAuth 1.0a request signing and nonce-based replay protection for
//! Learning Tools Interoperability (LTI) tool providers.
//!
//! An LTI launch (and the later grade-passback "outcomes" callback) is an
//! HTTP request signed with a shared consumer secret. This crate
//! authenticates those requests: it rebuilds the canonical signature base
//! string, checks the HMAC-SHA1 signature in constant time, and rejects
//! replays through a nonce ledger with pluggable storage.
//!
//! ## Features
//!
//! - **OAuth 1.0a signatures**: canonical base-string construction and
//!   HMAC-SHA1 signing/verification
//! - **Replay protection**: each (nonce, timestamp) pair is accepted once
//!   within a sliding window
//! - **Pluggable nonce stores**: in-memory for single-process tools, Redis
//!   (feature `redis-store`) for multi-instance deployments
//! - **Fail closed**: every rejection carries a specific error kind and no
//!   error path falls back to accepting a request
//! - **Async API**: nonce stores are async and safe to share across
//!   request handlers
//!
//! ## Quick Start
//!
//! ```rust
//! use lti_auth::{RequestSigner, RequestVerifier, SignatureRequest, store::MemoryNonceStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), lti_auth::AuthError> {
//! // The platform side signs a launch with the shared secret.
//! let signer = RequestSigner::new("consumer_key", "consumer_secret");
//! let launch = signer.sign_request(
//!     SignatureRequest::new("POST", "https://tool.example.com/launch")
//!         .param("lti_message_type", "basic-lti-launch-request")
//!         .param("lti_version", "LTI-1p0")
//!         .param("user_id", "student-42"),
//! )?;
//!
//! // The tool side verifies the signature and consumes the nonce.
//! let verifier = RequestVerifier::new(Arc::new(MemoryNonceStore::new()))
//!     .with_consumer_secret("consumer_secret");
//! verifier.verify(&launch).await?;
//!
//! // Replaying the same launch is rejected.
//! assert!(verifier.verify(&launch).await.is_err());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`SignatureEngine`] and [`base_string`]: pure signing/verification
//!   over explicit inputs
//! - [`store::NonceStore`]: the single stateful boundary; implemented by
//!   [`store::MemoryNonceStore`] and `store::RedisNonceStore`
//! - [`RequestVerifier`] / [`RequestSigner`]: the inbound and outbound
//!   composition over both
//! - [`AuthError`]: one variant per failure mode, with backend
//!   unavailability kept distinct from authentication rejections

use serde::{Deserialize, Serialize};

pub mod oauth;

// Re-export commonly used types
pub use oauth::{
    AuthError, MemoryNonceStore, ReplayConfig, RequestSigner, RequestVerifier, SignatureEngine,
    base_string, generate_nonce, percent_encode, store,
};

#[cfg(feature = "redis-store")]
pub use oauth::RedisNonceStore;

/// The inputs to a signature computation.
///
/// - `method`: HTTP verb; upper-cased during base-string construction.
/// - `url`: absolute target URL. Scheme, host, and path are significant;
///   the query string is excluded from signing, so callers must merge
///   query entries into `parameters` before signing or verifying.
/// - `parameters`: the full parameter set, `oauth_*` protocol parameters
///   included. Repeated keys express multi-valued parameters.
///
/// The base string derived from these fields is a pure function of them,
/// which keeps signing referentially transparent and trivially testable.
///
/// # Example
///
/// ```rust
/// use lti_auth::SignatureRequest;
///
/// let request = SignatureRequest::new("POST", "https://tool.example.com/launch")
///     .param("lti_message_type", "basic-lti-launch-request")
///     .param("roles", "Instructor")
///     .param("roles", "Learner"); // multi-valued
/// assert_eq!(request.parameters.len(), 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRequest {
    /// HTTP verb of the request being signed or verified.
    pub method: String,

    /// Absolute target URL, query string excluded.
    pub url: String,

    /// Parameter set as (name, value) pairs; unordered, repeats legal.
    pub parameters: Vec<(String, String)>,
}

impl SignatureRequest {
    /// Creates a request with an empty parameter set.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            parameters: Vec::new(),
        }
    }

    /// Appends one parameter; call repeatedly for multi-valued keys.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }
}
