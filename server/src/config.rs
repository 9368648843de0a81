use clap::Parser;
use shared::{
    COMBAT_TAG_PORT, LEVEL_COMPLETION_PORT, PLAYER_LIST_PORT, PLAYER_TIMEOUT_MS,
    POSITION_UPDATE_PORT, SWEEP_INTERVAL_MS,
};
use std::net::SocketAddr;
use std::time::Duration;

/// Combat-group state sync server
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Address to bind all four endpoints to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,

    /// UDP port receiving position updates
    #[arg(long, default_value_t = POSITION_UPDATE_PORT)]
    pub position_port: u16,

    /// UDP port answering player-list requests
    #[arg(long, default_value_t = PLAYER_LIST_PORT)]
    pub list_port: u16,

    /// TCP port accepting combat-tag assignments
    #[arg(long, default_value_t = COMBAT_TAG_PORT)]
    pub combat_port: u16,

    /// TCP port accepting level-completion reports
    #[arg(long, default_value_t = LEVEL_COMPLETION_PORT)]
    pub level_port: u16,

    /// How often stale players are swept, in milliseconds
    #[arg(long, default_value_t = SWEEP_INTERVAL_MS)]
    pub sweep_interval_ms: u64,

    /// Idle time after which a player is evicted, in milliseconds
    #[arg(long, default_value_t = PLAYER_TIMEOUT_MS)]
    pub player_timeout_ms: u64,

    /// Deadline for reading a control message; 0 waits forever
    #[arg(long, default_value_t = 5_000)]
    pub tcp_read_timeout_ms: u64,

    /// Skip the synthetic player normally present at startup
    #[arg(long = "no-seed-player", action = clap::ArgAction::SetFalse)]
    pub seed_player: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            position_port: POSITION_UPDATE_PORT,
            list_port: PLAYER_LIST_PORT,
            combat_port: COMBAT_TAG_PORT,
            level_port: LEVEL_COMPLETION_PORT,
            sweep_interval_ms: SWEEP_INTERVAL_MS,
            player_timeout_ms: PLAYER_TIMEOUT_MS,
            tcp_read_timeout_ms: 5_000,
            seed_player: true,
        }
    }
}

impl ServerConfig {
    /// Loopback config on ephemeral ports, for tests
    pub fn ephemeral() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            position_port: 0,
            list_port: 0,
            combat_port: 0,
            level_port: 0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sweep_interval_ms == 0 {
            return Err("sweep interval must be at least 1ms".to_string());
        }
        if self.player_timeout_ms == 0 {
            return Err("player timeout must be at least 1ms".to_string());
        }
        self.addr(0)?;
        Ok(())
    }

    pub fn addr(&self, port: u16) -> Result<SocketAddr, String> {
        format!("{}:{}", self.host, port)
            .parse()
            .or_else(|_| format!("[{}]:{}", self.host, port).parse())
            .map_err(|_| format!("invalid host '{}'", self.host))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn tcp_read_timeout(&self) -> Option<Duration> {
        match self.tcp_read_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}
