use crate::ClientMessage;
use crate::Event;
use crate::ServerMessage;

/// Errors that can occur while decoding or validating a client message.
#[derive(Debug, Clone)]
pub enum ProtocolError {
    Malformed(String),
    RateLimited,
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(s) => write!(f, "malformed client message: {}", s),
            Self::RateLimited => write!(f, "rate limit exceeded"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Handles `Event` <-> `ServerMessage` conversion and client-message
/// decoding. Centralizes the boundary between internal, process-local
/// signalling and the wire format so that neither the orchestrator nor
/// the matchmaking coordinator needs to know about JSON.
pub struct Protocol;

impl Protocol {
    /// Converts an internal `Event` to a wire `ServerMessage`.
    /// Returns `None` for events that never cross the wire (e.g. a
    /// same-process disconnect signal).
    pub fn encode(event: &Event) -> Option<ServerMessage> {
        match event {
            Event::QueueUpdate {
                position,
                elapsed_seconds,
            } => Some(ServerMessage::QueueUpdate {
                position: *position,
                elapsed_seconds: *elapsed_seconds,
            }),
            Event::MatchFound {
                match_id,
                opponent,
                words,
                mode,
            } => Some(ServerMessage::MatchFound {
                match_id: *match_id,
                opponent: opponent.clone(),
                words: words.clone(),
                mode: *mode,
            }),
            Event::GameStart {
                scheduled_start_time_ms,
                duration_seconds,
            } => Some(ServerMessage::GameStart {
                scheduled_start_time_ms: *scheduled_start_time_ms,
                duration_seconds: *duration_seconds,
            }),
            Event::OpponentProgress {
                char_index,
                word_index,
            } => Some(ServerMessage::OpponentProgress {
                char_index: *char_index,
                word_index: *word_index,
            }),
            Event::GameEnd { result } => Some(ServerMessage::GameEnd {
                result: Box::new((**result).clone()),
            }),
            Event::InvalidKeystroke { reason } => Some(ServerMessage::error(
                crate::ErrorCode::InvalidKeystroke,
                reason.clone(),
            )),
            Event::Disconnect => None,
        }
    }
    /// Parses a raw text frame into a `ClientMessage`.
    pub fn decode(raw: &str) -> Result<ClientMessage, ProtocolError> {
        serde_json::from_str(raw).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_valid_keystroke() {
        let raw = r#"{"type":"keystroke","char":"a","timestamp":100,"char_index":0}"#;
        assert!(Protocol::decode(raw).is_ok());
    }

    #[test]
    fn decode_invalid_json_is_malformed() {
        assert!(Protocol::decode("not json").is_err());
    }

    #[test]
    fn decode_unknown_tag_is_malformed() {
        let raw = r#"{"type":"not_a_real_message"}"#;
        assert!(Protocol::decode(raw).is_err());
    }

    #[test]
    fn encode_disconnect_does_not_cross_the_wire() {
        assert!(Protocol::encode(&Event::Disconnect).is_none());
    }

    #[test]
    fn encode_invalid_keystroke_becomes_error_frame() {
        let event = Event::InvalidKeystroke {
            reason: "too fast".to_string(),
        };
        match Protocol::encode(&event) {
            Some(ServerMessage::Error { code, .. }) => {
                assert_eq!(code, crate::ErrorCode::InvalidKeystroke)
            }
            other => panic!("expected error frame, got {other:?}"),
        }
    }
}
