//! Pluggable nonce stores for replay protection.
//!
//! A nonce store tracks which (nonce, timestamp) pairs have already been
//! consumed within a sliding replay window. The in-memory store is always
//! available; the Redis store (feature `redis-store`) shares one ledger
//! across multiple process instances.

use crate::oauth::config::ReplayConfig;
use crate::oauth::error::AuthError;
use async_trait::async_trait;

mod memory;
pub use memory::MemoryNonceStore;

#[cfg(feature = "redis-store")]
mod redis;
#[cfg(feature = "redis-store")]
pub use redis::RedisNonceStore;

/// The anti-replay ledger consulted on every authenticated request.
///
/// `is_new` must behave as an atomic check-and-set: of any number of
/// concurrent `is_new`/`set_used` calls for the same nonce, at most one
/// observes the "new" outcome. Implementations own their storage and
/// expiry mechanics; callers depend only on this interface and construct
/// stores explicitly (no ambient global ledger), so tests can use an
/// isolated store per case.
///
/// # Example Implementation
///
/// ```rust
/// use lti_auth::store::NonceStore;
/// use lti_auth::AuthError;
/// use async_trait::async_trait;
/// use std::collections::HashMap;
/// use tokio::sync::Mutex;
///
/// struct SingleUseStore {
///     seen: Mutex<HashMap<String, i64>>,
/// }
///
/// #[async_trait]
/// impl NonceStore for SingleUseStore {
///     async fn is_new(&self, nonce: &str, timestamp: Option<u64>) -> Result<(), AuthError> {
///         if nonce.is_empty() || timestamp.is_none() {
///             return Err(AuthError::MissingParameter);
///         }
///         let mut seen = self.seen.lock().await;
///         if seen.contains_key(nonce) {
///             return Err(AuthError::Replayed);
///         }
///         seen.insert(nonce.to_string(), 0);
///         Ok(())
///     }
///
///     async fn set_used(&self, nonce: &str, _timestamp: u64) -> Result<(), AuthError> {
///         self.seen.lock().await.insert(nonce.to_string(), 0);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Optional backend initialization (connection checks, schema setup).
    async fn init(&self) -> Result<(), AuthError> {
        Ok(())
    }

    /// Validates and consumes a nonce in one atomic step.
    ///
    /// Checks, in order: required parameters present, timestamp within the
    /// replay window, nonce not already consumed. On success the nonce is
    /// recorded as used and `Ok(())` returned.
    ///
    /// # Errors
    ///
    /// * [`AuthError::MissingParameter`] - empty nonce or absent timestamp
    /// * [`AuthError::Expired`] - timestamp outside the replay window
    /// * [`AuthError::Replayed`] - nonce already consumed within the window
    /// * [`AuthError::BackendUnavailable`] - the backing store could not
    ///   be reached; the request was neither accepted nor rejected
    async fn is_new(&self, nonce: &str, timestamp: Option<u64>) -> Result<(), AuthError>;

    /// Unconditionally records a nonce as consumed.
    ///
    /// Skips the freshness checks of [`is_new`](Self::is_new); intended for
    /// callers that validated the request through a separate path and only
    /// need to mark consumption.
    async fn set_used(&self, nonce: &str, timestamp: u64) -> Result<(), AuthError>;
}

/// Shared freshness checks run by every backend before its atomic
/// check-and-set. Returns the validated timestamp.
pub(crate) fn check_freshness(
    nonce: &str,
    timestamp: Option<u64>,
    now: i64,
    config: &ReplayConfig,
) -> Result<u64, AuthError> {
    if nonce.is_empty() {
        return Err(AuthError::MissingParameter);
    }
    let timestamp = timestamp.ok_or(AuthError::MissingParameter)?;

    let age = now - timestamp as i64;
    if age > config.replay_window.as_secs() as i64 {
        return Err(AuthError::Expired);
    }
    // Only staleness rejects by default; clock-ahead clients are common.
    if let Some(max_skew) = config.max_future_skew {
        if -age > max_skew.as_secs() as i64 {
            return Err(AuthError::Expired);
        }
    }

    Ok(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(window: u64, skew: Option<u64>) -> ReplayConfig {
        ReplayConfig {
            replay_window: Duration::from_secs(window),
            max_future_skew: skew.map(Duration::from_secs),
        }
    }

    #[test]
    fn test_check_freshness_missing_parameters() {
        let cfg = config(300, None);
        assert!(matches!(
            check_freshness("", None, 1000, &cfg),
            Err(AuthError::MissingParameter)
        ));
        assert!(matches!(
            check_freshness("", Some(1000), 1000, &cfg),
            Err(AuthError::MissingParameter)
        ));
        assert!(matches!(
            check_freshness("n1", None, 1000, &cfg),
            Err(AuthError::MissingParameter)
        ));
    }

    #[test]
    fn test_check_freshness_window_boundaries() {
        let cfg = config(300, None);
        let now = 10_000;

        assert!(check_freshness("n1", Some(10_000), now, &cfg).is_ok());
        assert!(check_freshness("n1", Some(9_940), now, &cfg).is_ok());
        assert!(check_freshness("n1", Some(9_880), now, &cfg).is_ok());
        // Exactly at the window edge is still accepted.
        assert!(check_freshness("n1", Some(9_700), now, &cfg).is_ok());

        assert!(matches!(
            check_freshness("n1", Some(9_699), now, &cfg),
            Err(AuthError::Expired)
        ));
        assert!(matches!(
            check_freshness("n1", Some(6_400), now, &cfg),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn test_check_freshness_future_timestamps_default_policy() {
        let cfg = config(300, None);
        // Far-future timestamps pass under the default policy.
        assert!(check_freshness("n1", Some(20_000), 10_000, &cfg).is_ok());
    }

    #[test]
    fn test_check_freshness_future_skew_bound() {
        let cfg = config(300, Some(60));
        assert!(check_freshness("n1", Some(10_060), 10_000, &cfg).is_ok());
        assert!(matches!(
            check_freshness("n1", Some(10_061), 10_000, &cfg),
            Err(AuthError::Expired)
        ));
    }
}
