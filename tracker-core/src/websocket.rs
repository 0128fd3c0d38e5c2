//! WebSocket message types for the realtime signal feed
//!
//! These types define the protocol for WebSocket communication between
//! the tracker backend and clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Client -> Server Messages
// ============================================================================

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keepalive frame, sent on a fixed interval while the channel is open
    Ping,
}

// ============================================================================
// Server -> Client Messages
// ============================================================================

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Welcome frame sent once the connection is accepted
    Connected {
        message: String,
        user_id: i64,
    },
    /// A new trading signal was published
    NewSignal {
        /// Category discriminator (e.g. "funding_rate"); consumers filter
        /// on this to decide whether to refresh their data
        signal_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signal_id: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// An existing signal record was updated
    SignalUpdate {
        signal_type: String,
        signal_id: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// Per-user notification push
    Notification {
        data: Value,
    },
    /// Reply to a client ping
    Pong,
}

impl ServerMessage {
    /// Signal category, for signal-bearing messages
    pub fn signal_type(&self) -> Option<&str> {
        match self {
            Self::NewSignal { signal_type, .. } => Some(signal_type),
            Self::SignalUpdate { signal_type, .. } => Some(signal_type),
            _ => None,
        }
    }
}

// ============================================================================
// Feed Connection State
// ============================================================================

/// Lifecycle state of the feed connection manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
    /// No channel and nothing scheduled (ineligible or terminally closed)
    Idle,
    /// Transport handshake in progress
    Connecting,
    /// Channel open and receiving frames
    Open,
    /// Channel closed by a recoverable cause, reconnect timer pending
    RetryScheduled,
    /// Manager torn down; terminal
    Disposed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_wire_format() {
        let json = serde_json::to_string(&ClientMessage::Ping).unwrap();
        assert_eq!(json, r#"{"type":"ping"}"#);
    }

    #[test]
    fn test_parse_new_signal() {
        let msg: ServerMessage = serde_json::from_str(
            r#"{"type":"new_signal","signal_type":"funding_rate","signal_id":42}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ServerMessage::NewSignal {
                signal_type: "funding_rate".to_string(),
                signal_id: Some(42),
                data: None,
            }
        );
        assert_eq!(msg.signal_type(), Some("funding_rate"));
    }

    #[test]
    fn test_parse_signal_update_with_payload() {
        let msg: ServerMessage = serde_json::from_str(
            r#"{"type":"signal_update","signal_type":"mexc_dex","signal_id":7,"data":{"hourly_profit":1.5}}"#,
        )
        .unwrap();
        match msg {
            ServerMessage::SignalUpdate {
                signal_type,
                signal_id,
                data,
            } => {
                assert_eq!(signal_type, "mexc_dex");
                assert_eq!(signal_id, 7);
                assert_eq!(data.unwrap()["hourly_profit"], 1.5);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_frames_rejected() {
        assert!(serde_json::from_str::<ServerMessage>("not-json").is_err());
        assert!(serde_json::from_str::<ServerMessage>(r#"{"type":"bogus"}"#).is_err());
        assert!(serde_json::from_str::<ServerMessage>(r#"{"no_type":true}"#).is_err());
    }
}
