use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sliding-window inbound message limiter, one instance per connected
/// session (SPEC_FULL.md §6.1: 50 messages/second before an `ERROR
/// RATE_LIMIT_EXCEEDED` frame is sent and the message dropped).
pub struct RateLimiter {
    window: Duration,
    max_messages: u32,
    timestamps: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_messages: u32) -> Self {
        Self {
            window,
            max_messages,
            timestamps: VecDeque::with_capacity(max_messages as usize + 1),
        }
    }

    /// Records one inbound message and reports whether it's within the
    /// limit. Always records, even on rejection, so the sender can't dodge
    /// enforcement by flooding past the window boundary.
    pub fn admit(&mut self) -> bool {
        let now = Instant::now();
        while let Some(&oldest) = self.timestamps.front() {
            if now.duration_since(oldest) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
        self.timestamps.push_back(now);
        self.timestamps.len() as u32 <= self.max_messages
    }
}
