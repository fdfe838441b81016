//! Client configuration from environment variables

use std::env;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 31457;
pub const DEFAULT_NICK: &str = "rustacean";
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub nick: String,
    pub team: String,
    /// Fixed RNG seed; None derives one from the clock
    pub seed: Option<u32>,
    pub handshake_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            nick: DEFAULT_NICK.to_string(),
            team: String::new(),
            seed: None,
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    /// Read `TETRINET_*` variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (used by tests to avoid touching the process env)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let host = non_empty("TETRINET_HOST").unwrap_or(defaults.host);
        let port = non_empty("TETRINET_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);
        // Nicks travel as a single protocol token.
        let nick = non_empty("TETRINET_NICK")
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join("_"))
            .unwrap_or(defaults.nick);
        let team = non_empty("TETRINET_TEAM").unwrap_or_default();
        let seed = non_empty("TETRINET_SEED").and_then(|s| s.parse().ok());
        let handshake_timeout_ms = non_empty("TETRINET_HANDSHAKE_TIMEOUT_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.handshake_timeout_ms);

        Self {
            host,
            port,
            nick,
            team,
            seed,
            handshake_timeout_ms,
        }
    }

    /// `host:port` as accepted by `TcpStream::connect`
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms.max(1))
    }
}
