use std::time::Duration;

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Rooms with no traffic for this long are closed
    pub room_idle_secs: u64,
    pub sweep_interval_secs: u64,
    /// Concurrent WebSocket connections
    pub max_connections: usize,
    /// Text frames larger than this are dropped unread
    pub max_message_bytes: usize,
    pub max_room_id_len: usize,
    /// Length of server-generated room codes
    pub room_code_len: usize,
    /// Queued outbound messages per peer before new ones are dropped
    pub peer_queue_len: usize,
    pub rng_seed: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            room_idle_secs: 30 * 60,
            sweep_interval_secs: 5 * 60,
            max_connections: 512,
            max_message_bytes: 16 * 1024,
            max_room_id_len: 32,
            room_code_len: 6,
            peer_queue_len: 64,
            rng_seed: 42,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `PORT`, `CARBALL_ROOM_IDLE_SECS`, `CARBALL_SWEEP_SECS`
    /// and `CARBALL_MAX_CONNECTIONS`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(port) = env_parse::<u16>("PORT") {
            config.listen_addr = format!("0.0.0.0:{port}");
        }
        if let Some(secs) = env_parse("CARBALL_ROOM_IDLE_SECS") {
            config.room_idle_secs = secs;
        }
        if let Some(secs) = env_parse("CARBALL_SWEEP_SECS") {
            config.sweep_interval_secs = secs;
        }
        if let Some(n) = env_parse("CARBALL_MAX_CONNECTIONS") {
            config.max_connections = n;
        }
        config
    }

    pub fn room_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.room_idle_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("listen_addr '{}' is not a socket address", self.listen_addr));
        }
        if self.room_idle_secs == 0 {
            return Err("room_idle_secs must be > 0".to_string());
        }
        if self.sweep_interval_secs == 0 {
            return Err("sweep_interval_secs must be > 0".to_string());
        }
        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }
        if self.max_message_bytes < 256 {
            return Err("max_message_bytes must be at least 256".to_string());
        }
        if self.room_code_len == 0 || self.room_code_len > self.max_room_id_len {
            return Err("room_code_len must be in 1..=max_room_id_len".to_string());
        }
        if self.peer_queue_len == 0 {
            return Err("peer_queue_len must be > 0".to_string());
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}
