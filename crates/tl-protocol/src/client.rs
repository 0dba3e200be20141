use tl_core::CharIndex;
use tl_core::Millis;
use tl_core::WordIndex;

/// Messages sent from client to server over the match session WebSocket.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinQueue,
    JoinTrainingQueue,
    JoinFriendsQueue,
    LeaveQueue,
    Keystroke {
        /// A single rune, or `"\u{8}"` for the distinguished backspace token.
        char: String,
        timestamp: Millis,
        char_index: CharIndex,
    },
    WordComplete {
        word_index: WordIndex,
    },
    Ping,
}

/// The backspace token used on the wire in place of an actual rune.
pub const BACKSPACE: &str = "\u{8}";

impl ClientMessage {
    pub fn is_backspace_keystroke(&self) -> bool {
        matches!(self, ClientMessage::Keystroke { char, .. } if char == BACKSPACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keystroke_roundtrips_through_json() {
        let msg = ClientMessage::Keystroke {
            char: "a".to_string(),
            timestamp: 12_345,
            char_index: 3,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"keystroke\""));
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn tagged_variant_names_are_snake_case() {
        let json = serde_json::to_string(&ClientMessage::JoinTrainingQueue).unwrap();
        assert_eq!(json, r#"{"type":"join_training_queue"}"#);
    }

    #[test]
    fn backspace_token_is_detected() {
        let msg = ClientMessage::Keystroke {
            char: BACKSPACE.to_string(),
            timestamp: 0,
            char_index: 5,
        };
        assert!(msg.is_backspace_keystroke());
    }
}
