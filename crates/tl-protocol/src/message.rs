use tl_core::CharIndex;
use tl_core::Elo;
use tl_core::MatchId;
use tl_core::Millis;
use tl_core::Mode;
use tl_core::Outcome;
use tl_core::Rank;
use tl_core::Stat;
use tl_core::WordIndex;

/// Error codes surfaced to the client in an `ERROR` frame. Never fatal by
/// itself; the session stays open unless the transport layer decides
/// otherwise (e.g. an `AuthError` closes the socket before any frame like
/// this could be sent).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RateLimitExceeded,
    InvalidKeystroke,
    MatchError,
    NoFriends,
}

/// A prospective opponent's public profile, as shown to the other side of
/// a `MATCH_FOUND` frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OpponentProfile {
    pub display_name: String,
    pub photo_url: Option<String>,
    pub is_bot: bool,
    pub rank: Rank,
    pub elo: Elo,
    pub equipped_cursor: String,
    pub equipped_effect: Option<String>,
}

/// Coin reward breakdown, delivered as part of a `MatchResult`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CoinBreakdown {
    pub base: i64,
    pub rank_bonus: i64,
    pub leaderboard_bonus: i64,
    pub total: i64,
}

/// Settlement payload delivered to one side of a finished match, written
/// from that side's own perspective (`your_*` fields are the recipient's).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MatchResult {
    pub match_id: MatchId,
    pub mode: Mode,
    pub duration_seconds: u64,

    pub your_wpm: Stat,
    pub your_accuracy: Stat,
    pub your_score: Stat,
    pub your_elo_before: Elo,
    pub your_elo_after: Elo,
    pub your_elo_change: Elo,
    pub result: Outcome,
    pub coins: CoinBreakdown,

    pub opponent_display_name: String,
    pub opponent_photo_url: Option<String>,
    pub opponent_is_bot: bool,
    pub opponent_wpm: Stat,
    pub opponent_accuracy: Stat,
    pub opponent_score: Stat,
    pub opponent_rank: Rank,
    pub opponent_elo: Elo,
    pub opponent_elo_change: Elo,
}

/// Messages sent from server to client over the match session WebSocket.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    QueueUpdate {
        position: u32,
        elapsed_seconds: u64,
    },
    MatchFound {
        match_id: MatchId,
        opponent: OpponentProfile,
        words: Vec<String>,
        mode: Mode,
    },
    GameStart {
        scheduled_start_time_ms: Millis,
        duration_seconds: u64,
    },
    OpponentProgress {
        char_index: CharIndex,
        word_index: WordIndex,
    },
    GameEnd {
        result: Box<MatchResult>,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
    PublicMatchStarted {
        mode: Mode,
        display_names: Vec<String>,
    },
    PublicMatchEnded {
        mode: Mode,
        display_names: Vec<String>,
        outcome: Outcome,
    },
    OnlineCount {
        count: u64,
    },
    OnlineUsers {
        display_names: Vec<String>,
    },
    Pong {
        server_time_ms: Millis,
    },
}

impl ServerMessage {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("serialize server message")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_tags_code() {
        let msg = ServerMessage::error(ErrorCode::NoFriends, "no friends to match against");
        let json = msg.to_json();
        assert!(json.contains("\"type\":\"error\""));
        assert!(json.contains("\"code\":\"NO_FRIENDS\""));
    }

    #[test]
    fn game_end_carries_boxed_result() {
        let result = MatchResult {
            match_id: MatchId::default(),
            mode: Mode::Ranked,
            duration_seconds: 30,
            your_wpm: 100.0,
            your_accuracy: 98.0,
            your_score: 10_000.0,
            your_elo_before: 1500,
            your_elo_after: 1524,
            your_elo_change: 24,
            result: Outcome::Win,
            coins: CoinBreakdown {
                base: 300,
                rank_bonus: 60,
                leaderboard_bonus: 0,
                total: 360,
            },
            opponent_display_name: "opponent".to_string(),
            opponent_photo_url: None,
            opponent_is_bot: false,
            opponent_wpm: 60.0,
            opponent_accuracy: 96.0,
            opponent_score: 6_000.0,
            opponent_rank: Rank::Bronze,
            opponent_elo: 1500,
            opponent_elo_change: -24,
        };
        let msg = ServerMessage::GameEnd {
            result: Box::new(result),
        };
        let json = msg.to_json();
        let back: ServerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
