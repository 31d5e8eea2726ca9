//! Safe wall-clock access for timestamp validation.

use crate::oauth::error::AuthError;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in seconds since the Unix epoch.
///
/// Returns an error instead of panicking in the degenerate case where the
/// system clock reads before the epoch.
pub(crate) fn current_timestamp() -> Result<i64, AuthError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .map_err(|_| AuthError::Clock("system time is before Unix epoch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_timestamp() {
        let ts = current_timestamp().unwrap();
        // Anything after 2020-01-01 is a sane clock.
        assert!(ts > 1_577_836_800);
    }
}
