//! In-memory nonce store for single-process deployments.

use super::{NonceStore, check_freshness};
use crate::oauth::config::ReplayConfig;
use crate::oauth::error::AuthError;
use crate::oauth::time_utils::current_timestamp;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Nonce ledger backed by a process-local `HashMap`.
///
/// One mutex guards the check-and-insert, so concurrent `is_new` calls for
/// the same nonce serialize and exactly one succeeds. Entries older than
/// the replay window are pruned on every mutating access, which keeps the
/// map bounded by the request rate times the window; [`prune`](Self::prune)
/// is also available for an explicit periodic sweep.
///
/// Suitable only when a single process owns the authentication boundary.
/// Multi-process deployments must share a ledger through
/// `RedisNonceStore` instead.
///
/// # Example
///
/// ```rust
/// use lti_auth::store::{MemoryNonceStore, NonceStore};
///
/// # async fn example() -> Result<(), lti_auth::AuthError> {
/// let store = MemoryNonceStore::new();
/// let now = std::time::SystemTime::now()
///     .duration_since(std::time::UNIX_EPOCH)
///     .unwrap()
///     .as_secs();
///
/// store.is_new("launch-nonce-1", Some(now)).await?;
/// assert!(store.is_new("launch-nonce-1", Some(now)).await.is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryNonceStore {
    config: ReplayConfig,
    seen: Mutex<HashMap<String, i64>>,
}

impl MemoryNonceStore {
    /// Creates a store with the default replay policy.
    pub fn new() -> Self {
        Self::with_config(ReplayConfig::default())
    }

    /// Creates a store with an explicit replay policy.
    pub fn with_config(config: ReplayConfig) -> Self {
        Self {
            config,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Removes every record older than the replay window and returns how
    /// many were dropped.
    pub async fn prune(&self) -> Result<usize, AuthError> {
        let now = current_timestamp()?;
        let mut seen = self.seen.lock().await;
        let before = seen.len();
        Self::prune_locked(&mut seen, now, &self.config);
        Ok(before - seen.len())
    }

    /// Number of live records; exposed for monitoring and tests.
    pub async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }

    /// Whether the ledger currently holds no records.
    pub async fn is_empty(&self) -> bool {
        self.seen.lock().await.is_empty()
    }

    fn prune_locked(seen: &mut HashMap<String, i64>, now: i64, config: &ReplayConfig) {
        let window = config.replay_window.as_secs() as i64;
        seen.retain(|_, used_at| now - *used_at <= window);
    }
}

#[async_trait]
impl NonceStore for MemoryNonceStore {
    async fn is_new(&self, nonce: &str, timestamp: Option<u64>) -> Result<(), AuthError> {
        let now = current_timestamp()?;
        check_freshness(nonce, timestamp, now, &self.config)?;

        // Single lock across prune + check + insert: the atomic
        // check-and-set for this backend.
        let mut seen = self.seen.lock().await;
        Self::prune_locked(&mut seen, now, &self.config);
        if seen.contains_key(nonce) {
            tracing::warn!(nonce, "nonce replay rejected");
            return Err(AuthError::Replayed);
        }
        seen.insert(nonce.to_string(), now);
        tracing::debug!(nonce, "nonce accepted");
        Ok(())
    }

    async fn set_used(&self, nonce: &str, _timestamp: u64) -> Result<(), AuthError> {
        let now = current_timestamp()?;
        let mut seen = self.seen.lock().await;
        Self::prune_locked(&mut seen, now, &self.config);
        seen.insert(nonce.to_string(), now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn now_secs() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn store_with_window(window_secs: u64) -> MemoryNonceStore {
        MemoryNonceStore::with_config(ReplayConfig {
            replay_window: Duration::from_secs(window_secs),
            max_future_skew: None,
        })
    }

    #[tokio::test]
    async fn test_missing_parameters_rejected() {
        let store = store_with_window(300);
        let now = now_secs();

        assert!(matches!(
            store.is_new("", None).await,
            Err(AuthError::MissingParameter)
        ));
        assert!(matches!(
            store.is_new("", Some(now)).await,
            Err(AuthError::MissingParameter)
        ));
        assert!(matches!(
            store.is_new("n1", None).await,
            Err(AuthError::MissingParameter)
        ));
    }

    #[tokio::test]
    async fn test_distinct_nonces_both_accepted() {
        let store = store_with_window(300);
        let now = now_secs();

        store.is_new("nonce-a", Some(now)).await.unwrap();
        store.is_new("nonce-b", Some(now + 1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_reused_nonce_rejected() {
        let store = store_with_window(300);
        let now = now_secs();

        store.is_new("nonce-a", Some(now)).await.unwrap();
        assert!(matches!(
            store.is_new("nonce-a", Some(now + 1)).await,
            Err(AuthError::Replayed)
        ));
    }

    #[tokio::test]
    async fn test_timestamps_within_window_accepted() {
        let store = store_with_window(300);
        let now = now_secs();

        for (i, ts) in [now, now + 60, now - 60, now - 120].into_iter().enumerate() {
            store
                .is_new(&format!("fresh-{i}"), Some(ts))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_stale_timestamps_rejected() {
        let store = store_with_window(300);
        let now = now_secs();

        assert!(matches!(
            store.is_new("stale-1", Some(now - 301)).await,
            Err(AuthError::Expired)
        ));
        assert!(matches!(
            store.is_new("stale-2", Some(now - 3600)).await,
            Err(AuthError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_future_timestamps_accepted_by_default() {
        let store = store_with_window(300);
        let now = now_secs();

        store.is_new("ahead", Some(now + 60)).await.unwrap();
        store.is_new("far-ahead", Some(now + 7200)).await.unwrap();
    }

    #[tokio::test]
    async fn test_future_skew_bound_rejects_when_configured() {
        let store = MemoryNonceStore::with_config(ReplayConfig {
            replay_window: Duration::from_secs(300),
            max_future_skew: Some(Duration::from_secs(60)),
        });
        let now = now_secs();

        store.is_new("ahead-ok", Some(now + 30)).await.unwrap();
        assert!(matches!(
            store.is_new("ahead-bad", Some(now + 120)).await,
            Err(AuthError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_set_used_then_is_new_is_replay() {
        let store = store_with_window(300);
        let now = now_secs();

        store.set_used("consumed", now).await.unwrap();
        assert!(matches!(
            store.is_new("consumed", Some(now + 1)).await,
            Err(AuthError::Replayed)
        ));
    }

    #[tokio::test]
    async fn test_set_used_skips_validation() {
        let store = store_with_window(300);
        // A timestamp far outside the window is still recorded.
        store.set_used("already-checked", 1).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_records_are_pruned() {
        // Zero-second window: every record is expired on the next access.
        let store = store_with_window(0);
        let now = now_secs();

        store.set_used("short-lived", now).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        // The old identity may be reused without counting as a replay.
        store.is_new("short-lived", Some(now_secs())).await.unwrap();
        assert!(store.len().await <= 1);
    }

    #[tokio::test]
    async fn test_explicit_prune() {
        let store = store_with_window(0);
        store.set_used("a", now_secs()).await.unwrap();
        store.set_used("b", now_secs()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let removed = store.prune().await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_same_nonce_single_winner() {
        let store = Arc::new(store_with_window(300));
        let now = now_secs();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.is_new("contended", Some(now)).await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
    }

    #[tokio::test]
    async fn test_stores_are_isolated_instances() {
        let now = now_secs();
        let a = store_with_window(300);
        let b = store_with_window(300);

        a.is_new("shared-name", Some(now)).await.unwrap();
        // A different store instance has its own ledger.
        b.is_new("shared-name", Some(now)).await.unwrap();
    }
}
