//! Connection options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use termbridge_core::{Result, TerminalError};
use termbridge_sync::RetryOptions;

/// Options for one terminal connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionOptions {
    /// Application tag used for server-side routing. Alphanumerics and
    /// underscores only.
    pub application: String,
    /// History download cutoff. History older than this is never requested.
    pub history_start_time: Option<DateTime<Utc>>,
    /// Packet orderer gap timeout used by the transport layer.
    pub packet_ordering_timeout_in_seconds: u64,
    /// Retry and backoff tuning.
    pub retry: RetryOptions,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            application: "MetaApi".to_string(),
            history_start_time: None,
            packet_ordering_timeout_in_seconds: 60,
            retry: RetryOptions::default(),
        }
    }
}

impl ConnectionOptions {
    /// Load options from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TerminalError::Validation(format!("Failed to read config: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| TerminalError::Validation(format!("Failed to parse config: {e}")))
    }
}

/// Application tags are restricted to `[a-zA-Z0-9_]+`.
pub fn validate_application(application: &str) -> Result<()> {
    let valid = !application.is_empty()
        && application
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(TerminalError::Validation(format!(
            "Application tag must match [a-zA-Z0-9_]+, got {application:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConnectionOptions::default();
        assert_eq!(options.application, "MetaApi");
        assert_eq!(options.packet_ordering_timeout_in_seconds, 60);
        assert!(options.history_start_time.is_none());
    }

    #[test]
    fn test_application_charset() {
        assert!(validate_application("MetaApi").is_ok());
        assert!(validate_application("CopyFactory").is_ok());
        assert!(validate_application("app_2").is_ok());
        assert!(validate_application("").is_err());
        assert!(validate_application("bad app").is_err());
        assert!(validate_application("bad-app").is_err());
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let options: ConnectionOptions = toml::from_str("application = \"CopyFactory\"").unwrap();
        assert_eq!(options.application, "CopyFactory");
        assert_eq!(options.retry.subscribe_backoff_base_in_seconds, 3);
        assert_eq!(options.retry.synchronization_retry_base_in_seconds, 1);
    }
}
