// Server configuration.
//
// `ServerConfig::default()` is what the `server` binary runs with unless
// flags override it (see `main.rs`). `unpaced()` is the profile integration
// tests use: OS-assigned port on loopback, no reading delay between
// broadcasts, and a short idle poll so new players are picked up quickly.

use std::time::Duration;

use crate::queue::DEFAULT_CAPACITY;

pub const DEFAULT_PORT: u16 = 9212;

/// Configuration for starting a blackjack server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    /// 0 lets the OS pick a free port.
    pub port: u16,
    /// Delay after each broadcast so humans can keep up.
    pub pacing: Duration,
    /// How often an empty table checks for new players.
    pub idle_poll: Duration,
    pub action_queue_capacity: usize,
    pub output_queue_capacity: usize,
    /// Fixed shoe seed; `None` deals differently every run.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            pacing: Duration::from_millis(600),
            idle_poll: Duration::from_secs(1),
            action_queue_capacity: DEFAULT_CAPACITY,
            output_queue_capacity: DEFAULT_CAPACITY,
            seed: None,
        }
    }
}

impl ServerConfig {
    /// Loopback, ephemeral port, no pacing.
    pub fn unpaced() -> Self {
        Self {
            bind_address: "127.0.0.1".into(),
            port: 0,
            pacing: Duration::ZERO,
            idle_poll: Duration::from_millis(10),
            ..Self::default()
        }
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
