//! Fire-and-forget structured event sink for settlement and matchmaking
//! failures that should be visible to operators without ever failing
//! the caller's own flow.
use std::sync::Mutex;

use async_trait::async_trait;
use tl_core::{MatchId, PlayerId};

#[derive(Debug, Clone, PartialEq)]
pub enum AuditEvent {
    SettlementStepFailed {
        match_id: MatchId,
        step: &'static str,
        reason: String,
    },
    NotificationDeliveryFailed {
        player: PlayerId,
        kind: &'static str,
        attempts: u32,
    },
    ForfeitDeclared {
        match_id: MatchId,
        player: PlayerId,
    },
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Must never raise; a broken audit pipe is not allowed to affect
    /// the caller's own control flow.
    async fn log(&self, event: AuditEvent);
}

/// Logs through the `log` facade, matching the teacher's logging
/// conventions, and also records events in memory for assertions.
#[derive(Default)]
pub struct LoggingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl LoggingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit sink lock poisoned").clone()
    }
}

#[async_trait]
impl AuditSink for LoggingAuditSink {
    async fn log(&self, event: AuditEvent) {
        log::warn!("audit event: {event:?}");
        self.events.lock().expect("audit sink lock poisoned").push(event);
    }
}
