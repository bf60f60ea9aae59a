//! Per-replica synchronization state.

use std::collections::HashSet;

/// Synchronization bookkeeping for one replica of a connection.
///
/// At most one `should_synchronize` token is authoritative at a time: a retry
/// that captured an older token must neither reschedule itself nor mutate
/// this state.
#[derive(Debug, Clone)]
pub struct InstanceSyncState {
    pub instance_index: u32,
    /// Token of the most recent synchronize request sent to the transport.
    pub last_synchronization_id: Option<String>,
    /// Token captured when the replica disconnected, kept for diagnostics.
    pub last_disconnected_synchronization_id: Option<String>,
    /// Token of the currently authoritative synchronization attempt.
    pub should_synchronize: Option<String>,
    /// Synchronization ids whose order history finished downloading.
    pub orders_synchronized: HashSet<String>,
    /// Synchronization ids whose deal history finished downloading.
    pub deals_synchronized: HashSet<String>,
    /// Next retry delay for a failed synchronize attempt.
    pub synchronization_retry_interval_in_seconds: u64,
    pub synchronized: bool,
    pub disconnected: bool,
}

impl InstanceSyncState {
    pub fn new(instance_index: u32, retry_base_in_seconds: u64) -> Self {
        Self {
            instance_index,
            last_synchronization_id: None,
            last_disconnected_synchronization_id: None,
            should_synchronize: None,
            orders_synchronized: HashSet::new(),
            deals_synchronized: HashSet::new(),
            synchronization_retry_interval_in_seconds: retry_base_in_seconds,
            synchronized: false,
            disconnected: false,
        }
    }

    /// Whether `key` is still the authoritative synchronization token.
    pub fn token_matches(&self, key: &str) -> bool {
        self.should_synchronize.as_deref() == Some(key)
    }

    /// Current retry delay; doubles the stored interval up to `cap`.
    pub fn take_retry_delay(&mut self, cap_in_seconds: u64) -> u64 {
        let delay = self.synchronization_retry_interval_in_seconds;
        self.synchronization_retry_interval_in_seconds =
            (delay.saturating_mul(2)).min(cap_in_seconds);
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles_to_cap() {
        let mut state = InstanceSyncState::new(0, 1);
        let delays: Vec<u64> = (0..12).map(|_| state.take_retry_delay(300)).collect();
        assert_eq!(
            delays,
            vec![1, 2, 4, 8, 16, 32, 64, 128, 256, 300, 300, 300]
        );
    }

    #[test]
    fn test_token_matching() {
        let mut state = InstanceSyncState::new(0, 1);
        assert!(!state.token_matches("k1"));
        state.should_synchronize = Some("k1".to_string());
        assert!(state.token_matches("k1"));
        assert!(!state.token_matches("k2"));
    }
}
