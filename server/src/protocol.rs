//! Decoding of inbound client frames.

use protocol_core::ClientMessage;
use tracing::warn;

use crate::validation::validate_conversation_id;

/// How an inbound frame was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeSource {
    /// A JSON object shaped like [`ClientMessage`].
    Structured,
    /// Anything else; the whole payload became the message text.
    RawFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub message: String,
    pub conversation_id: String,
    pub source: DecodeSource,
}

pub fn new_conversation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Decode one inbound text payload. Never fails: a payload that is not a
/// JSON object with a string `message` is taken verbatim as the message.
pub fn decode_inbound(raw: &str) -> InboundMessage {
    let structured = serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .filter(|value| value.is_object())
        .and_then(|value| serde_json::from_value::<ClientMessage>(value).ok());

    match structured {
        Some(wire) => {
            let conversation_id = match wire.conversation_id {
                Some(id) => match validate_conversation_id(&id) {
                    Ok(()) => id,
                    Err(e) => {
                        warn!("{e}. Generated a new conversation ID.");
                        new_conversation_id()
                    }
                },
                None => new_conversation_id(),
            };
            InboundMessage {
                message: wire.message,
                conversation_id,
                source: DecodeSource::Structured,
            }
        }
        None => {
            warn!("Failed to decode JSON. Generated a new conversation ID.");
            InboundMessage {
                message: raw.to_string(),
                conversation_id: new_conversation_id(),
                source: DecodeSource::RawFallback,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_uuid(id: &str) -> bool {
        uuid::Uuid::parse_str(id).is_ok()
    }

    #[test]
    fn test_structured_message() {
        let inbound = decode_inbound(r#"{"message":"hello","conversation_id":"abc"}"#);
        assert_eq!(inbound.message, "hello");
        assert_eq!(inbound.conversation_id, "abc");
        assert_eq!(inbound.source, DecodeSource::Structured);
    }

    #[test]
    fn test_missing_conversation_id_is_generated() {
        let inbound = decode_inbound(r#"{"message":"hello"}"#);
        assert_eq!(inbound.source, DecodeSource::Structured);
        assert!(is_uuid(&inbound.conversation_id));

        let inbound = decode_inbound(r#"{"message":"hello","conversation_id":null}"#);
        assert!(is_uuid(&inbound.conversation_id));
    }

    #[test]
    fn test_missing_message_is_empty() {
        let inbound = decode_inbound(r#"{"conversation_id":"abc"}"#);
        assert_eq!(inbound.message, "");
        assert_eq!(inbound.conversation_id, "abc");
    }

    #[test]
    fn test_invalid_conversation_id_is_replaced() {
        let inbound = decode_inbound(r#"{"message":"hi","conversation_id":"has spaces"}"#);
        assert_eq!(inbound.message, "hi");
        assert!(is_uuid(&inbound.conversation_id));
    }

    #[test]
    fn test_plain_text_falls_back_to_raw() {
        let inbound = decode_inbound("just text");
        assert_eq!(inbound.message, "just text");
        assert_eq!(inbound.source, DecodeSource::RawFallback);
        assert!(is_uuid(&inbound.conversation_id));
    }

    #[test]
    fn test_non_object_json_falls_back_to_raw() {
        for raw in [r#""quoted""#, "42", r#"["hello","abc"]"#, r#"{"message":5}"#, "{"] {
            let inbound = decode_inbound(raw);
            assert_eq!(inbound.source, DecodeSource::RawFallback, "payload {raw}");
            assert_eq!(inbound.message, raw);
        }
    }

    #[test]
    fn test_fresh_ids_are_unique() {
        let a = decode_inbound("one");
        let b = decode_inbound("two");
        assert_ne!(a.conversation_id, b.conversation_id);
    }
}
