use std::time::Duration;

use serde::Deserialize;

use broadside_core::net::protocol::MAX_MESSAGE_SIZE;

/// Top-level server configuration, loaded from `broadside.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    pub limits: LimitsConfig,
    pub connection: ConnectionConfig,
    pub matches: MatchesConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            web_root: "web".to_string(),
            limits: LimitsConfig::default(),
            connection: ConnectionConfig::default(),
            matches: MatchesConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, queue and frame sizes).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    /// Capacity of each player's outbound queue.
    pub player_message_buffer: usize,
    /// Largest inbound frame accepted before the connection is dropped.
    pub max_message_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            player_message_buffer: 256,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

/// Liveness and write deadlines for each connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub write_wait_secs: u64,
    /// Read silence tolerated before the connection is dropped. Refreshed by pongs.
    pub pong_wait_secs: u64,
    pub ping_period_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            write_wait_secs: 10,
            pong_wait_secs: 60,
            ping_period_secs: 54,
        }
    }
}

impl ConnectionConfig {
    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs)
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs)
    }

    pub fn ping_period(&self) -> Duration {
        Duration::from_secs(self.ping_period_secs)
    }
}

/// Match lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchesConfig {
    /// Award unfinished matches to the opponent when a participant disconnects.
    pub forfeit_on_disconnect: bool,
}

impl Default for MatchesConfig {
    fn default() -> Self {
        Self {
            forfeit_on_disconnect: true,
        }
    }
}

impl ServerConfig {
    /// Validate configuration, exiting the process on unusable values.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }

        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.player_message_buffer == 0 {
            tracing::error!("limits.player_message_buffer must be > 0");
            std::process::exit(1);
        }
        if self.limits.max_message_size == 0 {
            tracing::error!("limits.max_message_size must be > 0");
            std::process::exit(1);
        }

        if self.connection.write_wait_secs == 0 || self.connection.pong_wait_secs == 0 {
            tracing::error!("connection.write_wait_secs and connection.pong_wait_secs must be > 0");
            std::process::exit(1);
        }
        if !self.connection.ping_period_is_valid() {
            tracing::error!(
                ping = self.connection.ping_period_secs,
                pong = self.connection.pong_wait_secs,
                "connection.ping_period_secs must be > 0 and < pong_wait_secs"
            );
            std::process::exit(1);
        }

        if !self.matches.forfeit_on_disconnect {
            tracing::warn!("forfeit_on_disconnect is off: abandoned matches will never finish");
        }
    }

    /// Load config from `broadside.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("broadside.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from broadside.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse broadside.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No broadside.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(port) = std::env::var("PORT")
            && let Ok(port) = port.parse::<u16>()
        {
            config.listen_addr = format!("0.0.0.0:{port}");
        }
        if let Ok(addr) = std::env::var("BROADSIDE_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(root) = std::env::var("BROADSIDE_WEB_ROOT")
            && !root.is_empty()
        {
            config.web_root = root;
        }
        if let Ok(val) = std::env::var("BROADSIDE_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_ws_connections = n;
        }

        config
    }
}

impl ConnectionConfig {
    fn ping_period_is_valid(&self) -> bool {
        self.ping_period_secs > 0 && self.ping_period_secs < self.pong_wait_secs
    }
}
