//! Streaming packet envelope.
//!
//! Every frame pushed by the terminal transport carries this envelope; the
//! payload beyond the routing fields stays untyped and is decoded by whichever
//! listener hook consumes it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Packet type that opens a new synchronization session.
pub const SYNCHRONIZATION_STARTED: &str = "synchronizationStarted";

/// A streaming frame from the terminal transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    /// Account the frame belongs to.
    pub account_id: String,
    /// Frame type discriminator (e.g. "prices", "synchronizationStarted").
    #[serde(rename = "type")]
    pub packet_type: String,
    /// Replica index. Absent means replica 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_index: Option<u32>,
    /// Per-session sequence number. Frames without one bypass ordering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,
    /// Server timestamp (Unix ms) stamping the session this frame belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_timestamp: Option<i64>,
    /// Synchronization attempt the frame belongs to, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synchronization_id: Option<String>,
    /// Remaining payload fields.
    #[serde(flatten)]
    pub body: Value,
}

impl Packet {
    /// Replica index with the default applied.
    pub fn instance(&self) -> u32 {
        self.instance_index.unwrap_or(0)
    }

    /// Whether this frame opens a new synchronization session.
    pub fn starts_session(&self) -> bool {
        self.packet_type == SYNCHRONIZATION_STARTED && self.synchronization_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_instance_defaults_to_zero() {
        let packet: Packet = serde_json::from_value(json!({
            "accountId": "acct-1",
            "type": "prices",
        }))
        .unwrap();
        assert_eq!(packet.instance(), 0);
        assert!(packet.sequence_number.is_none());
    }

    #[test]
    fn test_session_start_detection() {
        let packet: Packet = serde_json::from_value(json!({
            "accountId": "acct-1",
            "type": "synchronizationStarted",
            "instanceIndex": 1,
            "sequenceNumber": 5,
            "sequenceTimestamp": 100,
            "synchronizationId": "s1",
        }))
        .unwrap();
        assert!(packet.starts_session());
        assert_eq!(packet.instance(), 1);
    }

    #[test]
    fn test_extra_fields_land_in_body() {
        let packet: Packet = serde_json::from_value(json!({
            "accountId": "acct-1",
            "type": "prices",
            "prices": [{"symbol": "EURUSD"}],
        }))
        .unwrap();
        assert!(packet.body.get("prices").is_some());
    }
}
