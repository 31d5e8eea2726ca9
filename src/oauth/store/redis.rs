//! Redis-backed nonce store for multi-process deployments.
//!
//! When several process instances sit behind one authentication boundary,
//! in-process serialization is not enough: the check-and-set must happen
//! in the shared backend. This store uses a single `SET key value NX EX`
//! per nonce, Redis's native atomic conditional-set-with-expiry, and
//! delegates record expiry to the key TTL.

use super::{NonceStore, check_freshness};
use crate::oauth::config::ReplayConfig;
use crate::oauth::error::AuthError;
use crate::oauth::time_utils::current_timestamp;
use async_trait::async_trait;
use redis::{Client, aio::MultiplexedConnection};
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Nonce ledger shared across processes through Redis.
///
/// Every network operation is bounded by an operation timeout and surfaces
/// [`AuthError::BackendUnavailable`] on failure, so a degraded Redis never
/// hangs request handling and is never mistaken for an authentication
/// rejection.
///
/// # Example
///
/// ```rust,no_run
/// use lti_auth::store::RedisNonceStore;
///
/// # fn example() -> Result<(), lti_auth::AuthError> {
/// let store = RedisNonceStore::new("redis://localhost:6379", "lti_auth")?;
/// # Ok(())
/// # }
/// ```
pub struct RedisNonceStore {
    client: Client,
    key_prefix: String,
    config: ReplayConfig,
    op_timeout: Duration,
    /// Reused multiplexed connection; replaced when a liveness check fails.
    conn: Mutex<Option<MultiplexedConnection>>,
}

impl RedisNonceStore {
    /// Creates a store for the given Redis URL and key prefix, with the
    /// default replay policy.
    ///
    /// The prefix namespaces this ledger's keys so unrelated applications
    /// sharing the Redis instance cannot collide with it.
    pub fn new(redis_url: &str, key_prefix: &str) -> Result<Self, AuthError> {
        Self::with_config(redis_url, key_prefix, ReplayConfig::default())
    }

    /// Creates a store with an explicit replay policy.
    pub fn with_config(
        redis_url: &str,
        key_prefix: &str,
        config: ReplayConfig,
    ) -> Result<Self, AuthError> {
        let client = Client::open(redis_url)
            .map_err(|e| AuthError::from_store_message(format!("Redis client error: {e}")))?;

        Ok(Self {
            client,
            key_prefix: key_prefix.to_string(),
            config,
            op_timeout: DEFAULT_OP_TIMEOUT,
            conn: Mutex::new(None),
        })
    }

    /// Overrides the per-operation network timeout (default 5 seconds).
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    fn make_key(&self, nonce: &str) -> String {
        let mut key = String::with_capacity(self.key_prefix.len() + nonce.len() + 1);
        key.push_str(&self.key_prefix);
        key.push(':');
        key.push_str(nonce);
        key
    }

    /// Replay window in whole seconds; Redis requires a TTL of at least 1.
    fn window_secs(&self) -> u64 {
        self.config.replay_window.as_secs().max(1)
    }

    /// Bounds a backend call by the operation timeout so a degraded Redis
    /// surfaces as an error instead of a hung request.
    async fn bounded<T, F>(&self, operation: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, redis::RedisError>>,
    {
        match tokio::time::timeout(self.op_timeout, operation).await {
            Ok(result) => {
                result.map_err(|e| AuthError::from_store_message(format!("Redis error: {e}")))
            }
            Err(_) => Err(AuthError::from_store_message(format!(
                "Redis operation timed out after {:?}",
                self.op_timeout
            ))),
        }
    }

    async fn get_connection(&self) -> Result<MultiplexedConnection, AuthError> {
        let mut conn_guard = self.conn.lock().await;

        if let Some(conn) = conn_guard.as_ref() {
            let mut probe = conn.clone();
            let ping = self
                .bounded(redis::cmd("PING").query_async::<_, String>(&mut probe))
                .await;
            match ping {
                Ok(_) => return Ok(conn.clone()),
                Err(_) => {
                    tracing::debug!("Redis connection dead, reconnecting");
                    *conn_guard = None;
                }
            }
        }

        let new_conn = self
            .bounded(self.client.get_multiplexed_tokio_connection())
            .await?;
        *conn_guard = Some(new_conn.clone());
        Ok(new_conn)
    }
}

#[async_trait]
impl NonceStore for RedisNonceStore {
    async fn init(&self) -> Result<(), AuthError> {
        let mut conn = self.get_connection().await?;
        let _: String = self
            .bounded(redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }

    async fn is_new(&self, nonce: &str, timestamp: Option<u64>) -> Result<(), AuthError> {
        let now = current_timestamp()?;
        check_freshness(nonce, timestamp, now, &self.config)?;

        let mut conn = self.get_connection().await?;
        let key = self.make_key(nonce);

        // SET NX EX is the whole check-and-set: the key exists exactly
        // while the nonce is inside the replay window, so a refused set
        // means a live replay.
        let outcome: Option<String> = self
            .bounded(
                redis::cmd("SET")
                    .arg(&key)
                    .arg(now)
                    .arg("NX")
                    .arg("EX")
                    .arg(self.window_secs())
                    .query_async(&mut conn),
            )
            .await?;

        match outcome {
            Some(_) => {
                tracing::debug!(nonce, "nonce accepted");
                Ok(())
            }
            None => {
                tracing::warn!(nonce, "nonce replay rejected");
                Err(AuthError::Replayed)
            }
        }
    }

    async fn set_used(&self, nonce: &str, _timestamp: u64) -> Result<(), AuthError> {
        let mut conn = self.get_connection().await?;
        let key = self.make_key(nonce);

        let _: String = self
            .bounded(
                redis::cmd("SET")
                    .arg(&key)
                    .arg(current_timestamp()?)
                    .arg("EX")
                    .arg(self.window_secs())
                    .query_async(&mut conn),
            )
            .await?;
        Ok(())
    }
}
