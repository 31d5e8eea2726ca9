use std::time::Duration;

/// Replay-protection policy for a nonce store.
///
/// # Environment Variables
///
/// `Default` reads overrides from the environment:
/// - `LTI_AUTH_REPLAY_WINDOW`: replay window in seconds (default: 300)
/// - `LTI_AUTH_MAX_FUTURE_SKEW`: maximum accepted clock-ahead skew in
///   seconds; unset means future timestamps are never rejected
///
/// # Example
///
/// ```rust
/// use lti_auth::ReplayConfig;
/// use std::time::Duration;
///
/// // Default policy: 5 minute window, future timestamps accepted.
/// let config = ReplayConfig::default();
///
/// // Symmetric window: reject timestamps more than 5 minutes ahead too.
/// let config = ReplayConfig {
///     replay_window: Duration::from_secs(300),
///     max_future_skew: Some(Duration::from_secs(300)),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// How long a consumed nonce stays live and how stale a timestamp may
    /// be before it is rejected.
    pub replay_window: Duration,

    /// Upper bound on how far ahead of the store's clock a timestamp may
    /// run. `None` accepts arbitrarily-future timestamps, matching the
    /// common deployment reality of clients running slightly ahead.
    pub max_future_skew: Option<Duration>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            replay_window: Duration::from_secs(
                std::env::var("LTI_AUTH_REPLAY_WINDOW")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            max_future_skew: std::env::var("LTI_AUTH_MAX_FUTURE_SKEW")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
        }
    }
}

impl ReplayConfig {
    /// Validates the policy and returns advisory warnings for settings
    /// that are legal but likely misconfigured.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.replay_window.as_secs() < 60 {
            warnings.push(
                "Very short replay window (< 1 minute) may reject legitimate launches from \
                 clients with clock skew"
                    .to_string(),
            );
        }
        if self.replay_window.as_secs() > 3600 {
            warnings.push(
                "Long replay window (> 1 hour) grows the nonce ledger and widens the replay \
                 surface"
                    .to_string(),
            );
        }
        if let Some(skew) = self.max_future_skew {
            if skew.as_secs() < 30 {
                warnings.push(
                    "Very tight future-skew bound (< 30 seconds) may reject clients running \
                     slightly ahead"
                        .to_string(),
                );
            }
        }

        warnings
    }
}
