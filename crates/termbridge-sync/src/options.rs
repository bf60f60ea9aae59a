//! Retry and wait tuning knobs.

use serde::{Deserialize, Serialize};

/// Backoff configuration for the synchronize retry loop and the subscribe
/// loop. The two bases are independent constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryOptions {
    /// First synchronize retry delay, in seconds.
    pub synchronization_retry_base_in_seconds: u64,
    /// Ceiling for the doubling synchronize retry delay.
    pub synchronization_retry_cap_in_seconds: u64,
    /// First subscribe backoff delay, in seconds.
    pub subscribe_backoff_base_in_seconds: u64,
    /// Ceiling for the doubling subscribe backoff delay.
    pub subscribe_backoff_cap_in_seconds: u64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            synchronization_retry_base_in_seconds: 1,
            synchronization_retry_cap_in_seconds: 300,
            subscribe_backoff_base_in_seconds: 3,
            subscribe_backoff_cap_in_seconds: 300,
        }
    }
}

/// Options for [`wait_synchronized`](crate::SynchronizationController::wait_synchronized).
#[derive(Debug, Clone)]
pub struct WaitSynchronizedOptions {
    /// Overall deadline for local and server-side synchronization.
    pub timeout_in_seconds: u64,
    /// Local polling interval.
    pub interval_in_milliseconds: u64,
    /// Restrict the wait to one replica.
    pub instance_index: Option<u32>,
    /// Wait for a specific synchronization attempt instead of the latest.
    pub synchronization_id: Option<String>,
    /// Application pattern forwarded to the server-side wait. Defaults by
    /// account application when unset.
    pub application_pattern: Option<String>,
}

impl Default for WaitSynchronizedOptions {
    fn default() -> Self {
        Self {
            timeout_in_seconds: 300,
            interval_in_milliseconds: 1000,
            instance_index: None,
            synchronization_id: None,
            application_pattern: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_defaults() {
        let retry = RetryOptions::default();
        assert_eq!(retry.synchronization_retry_base_in_seconds, 1);
        assert_eq!(retry.subscribe_backoff_base_in_seconds, 3);
        assert_eq!(retry.synchronization_retry_cap_in_seconds, 300);
        assert_eq!(retry.subscribe_backoff_cap_in_seconds, 300);
    }

    #[test]
    fn test_wait_defaults() {
        let options = WaitSynchronizedOptions::default();
        assert_eq!(options.timeout_in_seconds, 300);
        assert_eq!(options.interval_in_milliseconds, 1000);
        assert!(options.instance_index.is_none());
    }
}
