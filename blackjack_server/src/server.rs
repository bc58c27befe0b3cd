// TCP server: listener thread, connection threads, and the game loop thread.
//
// Architecture:
//
// - **Game loop thread**: owns the `GameLoop` and is the only thread that
//   drains the action queue. See `game.rs`.
// - **Listener thread** (`TcpListener::accept()` loop, non-blocking with a
//   50ms sleep so it can observe `keep_running`): spawns one connection thread
//   per accepted socket.
// - **Connection threads**: run `BlackjackService::handle_connection`. A
//   subscription's thread lives as long as the player (it is their push
//   pump, plus a watcher thread); an action call's thread exits after `Ack`.
//
// The registry is the only structure shared under a lock. Everything else
// moves through queues.
//
// Shutdown: `ServerHandle::stop` clears `keep_running` and waits for the
// listener to exit on its next poll. It then shuts down every subscription
// socket so no pump is left blocked on a stalled client, and a loop blocked
// pushing into such a pump's queue gets unstuck. Finally it joins the game
// loop, which exits at its next idle check or action wait.

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::game::GameLoop;
use crate::queue::action_queue;
use crate::registry::Registry;
use crate::rules::{CardSource, RandomShoe};
use crate::service::BlackjackService;

const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    listener: thread::JoinHandle<()>,
    game: thread::JoinHandle<()>,
    registry: Registry,
    service: BlackjackService,
}

impl ServerHandle {
    /// Current number of registered players.
    pub fn player_count(&self) -> usize {
        self.registry.len()
    }

    /// Stop accepting, disconnect every subscriber, and wait for the
    /// listener and game loop to exit.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        let _ = self.listener.join();
        self.service.close_all();
        let _ = self.game.join();
        info!("server stopped");
    }
}

/// Start a server dealing from a `RandomShoe` (seeded from `config.seed` if
/// set). Returns the handle and the bound address (useful with port 0).
pub fn start_server(config: ServerConfig) -> std::io::Result<(ServerHandle, SocketAddr)> {
    let shoe = match config.seed {
        Some(seed) => RandomShoe::from_seed(seed),
        None => RandomShoe::unseeded(),
    };
    start_server_with_shoe(config, Box::new(shoe))
}

/// Start a server dealing from an arbitrary card source.
pub fn start_server_with_shoe(
    config: ServerConfig,
    shoe: Box<dyn CardSource>,
) -> std::io::Result<(ServerHandle, SocketAddr)> {
    let listener = TcpListener::bind(config.listen_address())?;
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;

    let keep_running = Arc::new(AtomicBool::new(true));
    let registry = Registry::new(config.output_queue_capacity);
    let (actions_tx, actions_rx) = action_queue(config.action_queue_capacity);
    let service = BlackjackService::new(registry.clone(), actions_tx);

    let game = GameLoop::new(
        registry.clone(),
        actions_rx,
        shoe,
        &config,
        keep_running.clone(),
    );
    let game_thread = thread::Builder::new()
        .name("game-loop".into())
        .spawn(move || game.run())?;

    let keep_running_listener = keep_running.clone();
    let accept_service = service.clone();
    let listener_thread = thread::Builder::new()
        .name("listener".into())
        .spawn(move || accept_loop(listener, accept_service, keep_running_listener))?;

    info!(%addr, "blackjack server listening");
    Ok((
        ServerHandle {
            keep_running,
            listener: listener_thread,
            game: game_thread,
            registry,
            service,
        },
        addr,
    ))
}

fn accept_loop(listener: TcpListener, service: BlackjackService, keep_running: Arc<AtomicBool>) {
    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "accepted connection");
                if stream.set_nonblocking(false).is_err() {
                    continue;
                }
                let service = service.clone();
                let spawned = thread::Builder::new()
                    .name(format!("conn-{peer}"))
                    .spawn(move || service.handle_connection(stream));
                if let Err(e) = spawned {
                    warn!(error = %e, "could not spawn connection thread");
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                warn!(error = %e, "accept failed, listener exiting");
                break;
            }
        }
    }
}
