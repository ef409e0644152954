use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::ServerConfig;
use crate::engine::MatchEngine;
use crate::match_registry::MatchRegistry;
use crate::player_registry::PlayerRegistry;

#[derive(Clone)]
pub struct AppState {
    pub players: Arc<PlayerRegistry>,
    pub matches: Arc<MatchRegistry>,
    pub engine: MatchEngine,
    pub config: Arc<ServerConfig>,
    pub ws_connection_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let players = Arc::new(PlayerRegistry::new());
        let matches = Arc::new(MatchRegistry::new());
        Self {
            engine: MatchEngine::new(Arc::clone(&players), Arc::clone(&matches)),
            players,
            matches,
            config: Arc::new(config),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Counts a live WebSocket connection for as long as it is held.
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}
