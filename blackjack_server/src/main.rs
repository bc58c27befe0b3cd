// CLI entry point for the blackjack server.
//
// Starts the listener and game loop, then parks the main thread forever; the
// process is stopped by signal. See `server.rs` for the thread layout and
// `game.rs` for the round state machine.
//
// Usage:
//   server [OPTIONS]
//     --bind <ADDR>          Bind address (default: 0.0.0.0)
//     --port <PORT>          Listen port (default: 9212)
//     --pacing-ms <MS>       Delay after each broadcast (default: 600)
//     --idle-poll-ms <MS>    Empty-table poll interval (default: 1000)
//     --queue-capacity <N>   Action and output queue bound (default: 100)
//     --seed <SEED>          Deal from a fixed shoe
//
// Log level comes from RUST_LOG (default: info).

use std::thread;
use std::time::Duration;

use anyhow::Context;
use blackjack_server::config::{DEFAULT_PORT, ServerConfig};
use blackjack_server::queue::DEFAULT_CAPACITY;
use blackjack_server::start_server;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Multiplayer blackjack table server")]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Milliseconds to wait after each broadcast
    #[arg(long, default_value_t = 600)]
    pacing_ms: u64,

    /// Milliseconds between checks of an empty table
    #[arg(long, default_value_t = 1000)]
    idle_poll_ms: u64,

    /// Bound for the action queue and each player's output queue
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    queue_capacity: usize,

    /// Seed for a reproducible shoe
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_address: self.bind,
            port: self.port,
            pacing: Duration::from_millis(self.pacing_ms),
            idle_poll: Duration::from_millis(self.idle_poll_ms),
            action_queue_capacity: self.queue_capacity,
            output_queue_capacity: self.queue_capacity,
            seed: self.seed,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();
    let listen = config.listen_address();
    let (_handle, addr) =
        start_server(config).with_context(|| format!("failed to listen on {listen}"))?;
    info!(%addr, "ready for players");

    loop {
        thread::park();
    }
}
