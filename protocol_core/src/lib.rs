//! Wire shapes shared by the relay server and its clients.
//!
//! The connection carries two frame kinds. Text frames from the client hold a
//! [`ClientMessage`] (or arbitrary text, which the server accepts as the raw
//! message). Text frames from the server hold a [`ServerEvent`]; clients must
//! treat any text they cannot decode as a plain status string. Binary frames
//! only ever flow from the server and carry audio chunks in production order.

use serde::{Deserialize, Serialize};

/// Path the relay's WebSocket endpoint is mounted on.
pub const WS_PATH: &str = "/ws";

/// Upper bound for the size of a single audio chunk on the wire.
pub const DEFAULT_CHUNK_SIZE: usize = 1048;

/// Number of chunks a statically configured client waits for.
pub const DEFAULT_EXPECTED_CHUNKS: usize = 5;

/// Client to server message.
///
/// Both fields are lenient on decode: a missing `message` becomes the empty
/// string and a missing or null `conversation_id` is left for the server to
/// fill in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl ClientMessage {
    pub fn new(message: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: Some(conversation_id.into()),
        }
    }

    pub fn to_json(&self) -> String {
        // Serializing two strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Server to client informational/control events sent as text frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The reply that is about to be spoken.
    Reply {
        conversation_id: String,
        text: String,
        /// True when the completion upstream failed and the apology was used.
        fallback: bool,
    },
    /// Marks the end of one turn's binary frames.
    AudioEnd {
        chunks: usize,
        bytes: usize,
        /// False when synthesis stopped early; the audio is truncated.
        complete: bool,
    },
}

impl ServerEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decode a server text frame, `None` if it is not a known event.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    /// Human-readable line for a status display.
    pub fn status_line(&self) -> String {
        match self {
            ServerEvent::Reply { text, .. } => format!("Received message: {text}"),
            ServerEvent::AudioEnd {
                chunks,
                complete: true,
                ..
            } => format!("Audio complete ({chunks} chunks)"),
            ServerEvent::AudioEnd {
                chunks,
                complete: false,
                ..
            } => format!("Audio interrupted after {chunks} chunks"),
        }
    }
}

/// How a turn's binary frames are delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamFraming {
    /// No delimiter; clients rely on a statically configured chunk count.
    Static,
    /// An [`ServerEvent::AudioEnd`] frame follows the last chunk of every turn.
    #[default]
    Terminated,
}

impl std::str::FromStr for StreamFraming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(StreamFraming::Static),
            "terminated" | "end_marker" => Ok(StreamFraming::Terminated),
            other => Err(format!("unknown stream framing: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_tolerates_missing_fields() {
        let msg: ClientMessage = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(msg.message, "hi");
        assert!(msg.conversation_id.is_none());

        let msg: ClientMessage = serde_json::from_str(r#"{"conversation_id":null}"#).unwrap();
        assert_eq!(msg.message, "");
        assert!(msg.conversation_id.is_none());
    }

    #[test]
    fn client_message_wire_shape() {
        let json = ClientMessage::new("hello", "abc").to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["message"], "hello");
        assert_eq!(value["conversation_id"], "abc");
    }

    #[test]
    fn server_events_are_tagged() {
        let end = ServerEvent::AudioEnd {
            chunks: 3,
            bytes: 2500,
            complete: true,
        };
        let value: serde_json::Value = serde_json::from_str(&end.to_json()).unwrap();
        assert_eq!(value["type"], "audio_end");
        assert_eq!(ServerEvent::parse(&end.to_json()), Some(end));

        assert_eq!(ServerEvent::parse("Converted text to speech"), None);
        assert_eq!(ServerEvent::parse(r#"{"type":"other"}"#), None);
    }

    #[test]
    fn framing_parses_from_env_values() {
        assert_eq!("static".parse::<StreamFraming>(), Ok(StreamFraming::Static));
        assert_eq!(" Terminated ".parse::<StreamFraming>(), Ok(StreamFraming::Terminated));
        assert!("bogus".parse::<StreamFraming>().is_err());
    }
}
