use tl_core::PlayerId;

/// JWT payload asserting a player's identity. Mirrors the teacher's
/// `Claims` (`sub`/`iat`/`exp`), keyed by [`PlayerId`] rather than a
/// UUID subject since this crate has no separate member/session split.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(player: &PlayerId, ttl: std::time::Duration) -> Self {
        let now = now_secs();
        Self {
            sub: player.0.clone(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
        }
    }

    pub fn expired(&self) -> bool {
        self.exp < now_secs()
    }

    pub fn subject(&self) -> PlayerId {
        PlayerId::from(self.sub.as_str())
    }
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves forward")
        .as_secs() as i64
}
