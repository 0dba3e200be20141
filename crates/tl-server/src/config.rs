use std::time::Duration;

use tl_core::{RATE_LIMIT_MAX_MESSAGES, RATE_LIMIT_WINDOW_SECS};

/// Process-level configuration, read once at startup from the
/// environment. Mirrors the teacher's bootstrap in `crates/server`,
/// which pulls `BIND_ADDR` straight out of `std::env` and defaults the
/// actix-web worker count to the host's core count.
pub struct Config {
    pub bind_addr: String,
    pub workers: usize,
    pub jwt_secret: String,
    pub session_ttl: Duration,
    pub allowed_origins: Vec<String>,
    pub rate_limit_window: Duration,
    pub rate_limit_max_messages: u32,
}

impl Config {
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let workers = std::env::var("WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(num_cpus::get);
        let jwt_secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        let session_ttl_secs: u64 = std::env::var("SESSION_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        Self {
            bind_addr,
            workers,
            jwt_secret,
            session_ttl: Duration::from_secs(session_ttl_secs),
            allowed_origins,
            rate_limit_window: Duration::from_secs(RATE_LIMIT_WINDOW_SECS),
            rate_limit_max_messages: RATE_LIMIT_MAX_MESSAGES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        // SESSION_TTL_SECS/JWT_SECRET/ALLOWED_ORIGINS are environment-driven;
        // only the rate-limit defaults are checked here since they come
        // straight from tl-core's normative constants.
        let cfg = Config {
            bind_addr: "0.0.0.0:8080".to_string(),
            workers: 1,
            jwt_secret: "x".to_string(),
            session_ttl: Duration::from_secs(60),
            allowed_origins: Vec::new(),
            rate_limit_window: Duration::from_secs(RATE_LIMIT_WINDOW_SECS),
            rate_limit_max_messages: RATE_LIMIT_MAX_MESSAGES,
        };
        assert_eq!(cfg.rate_limit_max_messages, 50);
    }
}
