// Core components
mod config;
mod error;
mod time_utils;

// Signature engine
pub mod signature;

// Request-level convenience objects
mod signer;
mod verifier;

// Nonce stores
pub mod store;

pub use config::ReplayConfig;
pub use error::AuthError;
pub use signature::{SignatureEngine, base_string, percent_encode};
pub use signer::{RequestSigner, generate_nonce};
pub use store::{MemoryNonceStore, NonceStore};
pub use verifier::RequestVerifier;

#[cfg(feature = "redis-store")]
pub use store::RedisNonceStore;
