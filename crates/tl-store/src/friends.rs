//! Social graph lookups for the friends-mode queue.
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tl_core::PlayerId;

#[async_trait]
pub trait FriendGraph: Send + Sync {
    async fn friends_of(&self, player: &PlayerId) -> Vec<PlayerId>;
}

#[derive(Default)]
pub struct InMemoryFriendGraph {
    edges: RwLock<HashMap<PlayerId, Vec<PlayerId>>>,
}

impl InMemoryFriendGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a symmetric friendship between two players.
    pub fn befriend(&self, a: PlayerId, b: PlayerId) {
        let mut edges = self.edges.write().expect("friend graph lock poisoned");
        edges.entry(a.clone()).or_default().push(b.clone());
        edges.entry(b).or_default().push(a);
    }
}

#[async_trait]
impl FriendGraph for InMemoryFriendGraph {
    async fn friends_of(&self, player: &PlayerId) -> Vec<PlayerId> {
        self.edges
            .read()
            .expect("friend graph lock poisoned")
            .get(player)
            .cloned()
            .unwrap_or_default()
    }
}
