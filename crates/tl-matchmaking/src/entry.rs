//! One enqueued player's matchmaking profile, created on enqueue and
//! destroyed on pairing or cancellation.
use tl_core::{Elo, Millis, PlayerId};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QueueEntry {
    pub player_id: PlayerId,
    pub elo: Elo,
    pub display_name: String,
    pub photo_ref: Option<String>,
    /// Monotonic enqueue timestamp; doubles as the sorted-set score so
    /// FIFO ordering falls directly out of `zrange_oldest`.
    pub joined_at: Millis,
    pub equipped_cursor: String,
    pub equipped_effect: Option<String>,
}

impl QueueEntry {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("serialize queue entry")
    }
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> QueueEntry {
        QueueEntry {
            player_id: PlayerId::from("alice"),
            elo: 1500,
            display_name: "Alice".to_string(),
            photo_ref: None,
            joined_at: 1_000,
            equipped_cursor: "default".to_string(),
            equipped_effect: None,
        }
    }

    #[test]
    fn roundtrips_through_json() {
        let e = entry();
        let json = e.to_json();
        let back = QueueEntry::from_json(&json).unwrap();
        assert_eq!(e, back);
    }

    #[test]
    fn malformed_json_returns_none() {
        assert!(QueueEntry::from_json("not json").is_none());
    }
}
