use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use tl_core::{Mode, Outcome, PlayerId};
use tl_match::PublicSink;
use tl_protocol::ServerMessage;

/// Presence tick cadence (≈0.1 Hz, SPEC_FULL.md §6.3).
const PRESENCE_TICK_SECS: u64 = 10;

/// The broadcast registry every connected socket is enrolled in: fans
/// `PublicSink` events out to all of them, and periodically reports who's
/// online. Analogous to the teacher's lobby-wide event fan-out in
/// `rbp-hosting`, but keyed by `PlayerId` rather than a room id since
/// there's exactly one shared lobby here.
#[derive(Default)]
pub struct Presence {
    connections: RwLock<HashMap<PlayerId, (String, mpsc::UnboundedSender<String>)>>,
}

impl Presence {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn register(&self, player: PlayerId, display_name: String, tx: mpsc::UnboundedSender<String>) {
        self.connections.write().await.insert(player, (display_name, tx));
    }

    pub async fn unregister(&self, player: &PlayerId) {
        self.connections.write().await.remove(player);
    }

    async fn broadcast(&self, message: ServerMessage) {
        let json = message.to_json();
        let connections = self.connections.read().await;
        for (_, tx) in connections.values() {
            let _ = tx.send(json.clone());
        }
    }

    /// Spawns the periodic `ONLINE_COUNT`/`ONLINE_USERS` ticker. Runs
    /// until `tl_core::interrupted()` is observed, mirroring how the
    /// orchestrator's own background tasks drain on shutdown.
    pub fn spawn_ticker(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(PRESENCE_TICK_SECS)).await;
                if tl_core::interrupted() {
                    return;
                }
                let (count, names) = {
                    let connections = self.connections.read().await;
                    (
                        connections.len() as u64,
                        connections.values().map(|(name, _)| name.clone()).collect::<Vec<_>>(),
                    )
                };
                self.broadcast(ServerMessage::OnlineCount { count }).await;
                self.broadcast(ServerMessage::OnlineUsers { display_names: names }).await;
            }
        });
    }
}

#[async_trait]
impl PublicSink for Presence {
    async fn on_match_started(&self, mode: Mode, display_names: Vec<String>) {
        self.broadcast(ServerMessage::PublicMatchStarted { mode, display_names }).await;
    }

    async fn on_match_ended(&self, mode: Mode, display_names: Vec<String>, outcome: Outcome) {
        self.broadcast(ServerMessage::PublicMatchEnded { mode, display_names, outcome }).await;
    }
}
