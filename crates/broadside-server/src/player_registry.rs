use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Utf8Bytes;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;

use broadside_core::net::messages::ServerMessage;
use broadside_core::net::protocol::encode_server_message;
use broadside_core::player::{PlayerId, PlayerSummary, default_display_name};

/// Per-player sender for outbound WebSocket text frames.
/// Bounded so a slow client cannot exhaust memory.
pub type PlayerSender = mpsc::Sender<Utf8Bytes>;

/// A connected player: identity plus the producer side of their outbound queue.
///
/// Cloning is cheap; every clone feeds the same queue. Only the connection's
/// writer task ever touches the socket.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    pub id: PlayerId,
    pub name: String,
    sender: PlayerSender,
    shutdown: CancellationToken,
}

impl PlayerHandle {
    pub fn new(id: PlayerId, sender: PlayerSender, shutdown: CancellationToken) -> Self {
        Self {
            name: default_display_name(&id),
            id,
            sender,
            shutdown,
        }
    }

    /// Enqueue a message, waiting for room in the queue.
    /// Returns false if the queue is closed or the message could not be encoded.
    pub async fn send(&self, msg: &ServerMessage) -> bool {
        let Some(text) = encode(msg) else {
            return false;
        };
        if let Err(e) = self.sender.send(text).await {
            tracing::debug!(player_id = %self.id, error = %e, "Outbound queue closed");
            return false;
        }
        true
    }

    /// Enqueue a message without waiting. Fails if the queue is full or closed.
    fn try_send(&self, msg: &ServerMessage) -> bool {
        let Some(text) = encode(msg) else {
            return false;
        };
        match self.sender.try_send(text) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    player_id = %self.id, error = %e,
                    "Dropping message for slow or disconnected client"
                );
                false
            },
        }
    }

    /// Signal the connection's pumps to stop. Idempotent.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

fn encode(msg: &ServerMessage) -> Option<Utf8Bytes> {
    match encode_server_message(msg) {
        Ok(text) => Some(Utf8Bytes::from(text)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode server message");
            None
        },
    }
}

/// Process-wide map of connected players.
#[derive(Default)]
pub struct PlayerRegistry {
    players: RwLock<HashMap<PlayerId, PlayerHandle>>,
    dropped_deliveries: AtomicU64,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a player, replacing any existing entry with the same id.
    pub async fn register(&self, player: PlayerHandle) {
        let mut players = self.players.write().await;
        players.insert(player.id.clone(), player);
    }

    /// Remove a player and close their outbound queue.
    /// Returns false if the id was not registered.
    pub async fn unregister(&self, id: &str) -> bool {
        let mut players = self.players.write().await;
        match players.remove(id) {
            Some(player) => {
                player.close();
                true
            },
            None => false,
        }
    }

    pub async fn lookup(&self, id: &str) -> Option<PlayerHandle> {
        self.players.read().await.get(id).cloned()
    }

    /// Update a player's display name. Returns the updated handle.
    pub async fn set_name(&self, id: &str, name: String) -> Option<PlayerHandle> {
        let mut players = self.players.write().await;
        let player = players.get_mut(id)?;
        player.name = name;
        Some(player.clone())
    }

    /// Connected players ordered by id.
    pub async fn snapshot(&self) -> Vec<PlayerSummary> {
        let players = self.players.read().await;
        let mut out: Vec<PlayerSummary> = players
            .values()
            .map(|p| PlayerSummary {
                id: p.id.clone(),
                name: p.name.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    pub async fn len(&self) -> usize {
        self.players.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.players.read().await.is_empty()
    }

    /// Best-effort delivery: never waits on a full queue. Undeliverable
    /// messages are dropped and counted.
    pub async fn deliver(&self, id: &str, msg: &ServerMessage) -> bool {
        let delivered = match self.players.read().await.get(id) {
            Some(player) => player.try_send(msg),
            None => false,
        };
        if !delivered {
            self.dropped_deliveries.fetch_add(1, Ordering::Relaxed);
        }
        delivered
    }

    /// Number of best-effort deliveries dropped since startup.
    pub fn dropped_deliveries(&self) -> u64 {
        self.dropped_deliveries.load(Ordering::Relaxed)
    }
}
