//! Wire types for the `/ws/asr` session protocol.
//!
//! A tagged-enum pattern — `#[serde(tag = "type")]` framing — over the
//! coaching turn vocabulary (speech start/stop, partial/final transcript,
//! coach reply, error).

use crate::coach::CoachPayload;
use serde::{Deserialize, Serialize};

/// Client → server text frames. Binary frames are always raw PCM and are
/// handled outside this enum.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Start,
    Stop,
    Configure {
        #[serde(default)]
        vad_tail_ms: Option<u64>,
    },
    Ping,
}

/// Server → client text frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Ready,
    Vad {
        speaking: bool,
        turn_seq: u64,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        truncated: bool,
    },
    Partial {
        turn_seq: u64,
        text: String,
    },
    Final {
        turn_seq: u64,
        text: String,
        duration_ms: u64,
    },
    Coach {
        turn_seq: u64,
        payload: CoachPayload,
    },
    Error {
        kind: &'static str,
        message: String,
        fatal: bool,
    },
    Ping,
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_start_parses_from_json() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Start));
    }

    #[test]
    fn client_configure_parses_optional_field() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"configure","vad_tail_ms":300}"#).unwrap();
        match msg {
            ClientMessage::Configure { vad_tail_ms } => assert_eq!(vad_tail_ms, Some(300)),
            _ => panic!("expected Configure"),
        }
    }

    #[test]
    fn server_vad_serializes_without_truncated_when_false() {
        let msg = ServerMessage::Vad {
            speaking: true,
            turn_seq: 1,
            truncated: false,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("truncated").is_none());
    }

    #[test]
    fn server_error_round_trips_fatal_flag() {
        let msg = ServerMessage::Error {
            kind: "backpressure",
            message: "too slow".into(),
            fatal: true,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"fatal\":true"));
    }
}
