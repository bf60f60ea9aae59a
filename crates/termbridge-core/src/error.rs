//! Error types shared across the termbridge workspace.

use thiserror::Error;

/// Errors surfaced by the synchronization core.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// A transport call failed (network, HTTP, websocket). Retry loops catch
    /// and log this kind; consumer-facing operations propagate it.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The terminal rejected a trade request.
    #[error("Trade failed with {string_code} ({numeric_code}): {message}")]
    Trade {
        message: String,
        numeric_code: i64,
        string_code: String,
    },

    /// A wait for synchronization completion ran past its deadline.
    #[error(
        "Timed out waiting for account {account_id} to synchronize \
         (synchronization id {synchronization_id})"
    )]
    Timeout {
        account_id: String,
        synchronization_id: String,
    },

    /// A constructor or request argument failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// History storage could not be prepared or read.
    #[error("History storage error: {0}")]
    Storage(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, TerminalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_account_and_sync_id() {
        let err = TerminalError::Timeout {
            account_id: "acct-1".to_string(),
            synchronization_id: "sync-abc".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("acct-1"));
        assert!(msg.contains("sync-abc"));
    }

    #[test]
    fn test_trade_message_carries_codes() {
        let err = TerminalError::Trade {
            message: "market is closed".to_string(),
            numeric_code: 10018,
            string_code: "TRADE_RETCODE_MARKET_CLOSED".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("10018"));
        assert!(msg.contains("TRADE_RETCODE_MARKET_CLOSED"));
    }
}
