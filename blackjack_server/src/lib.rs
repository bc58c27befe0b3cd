// blackjack_server: turn-based multiplayer blackjack over TCP.
//
// Clients subscribe under a unique username, receive a push stream of table
// events, and answer `NeedsInput` prompts with unary HIT/STAND/LEAVE calls.
// One game loop thread owns the table; connection threads only move messages
// between sockets and queues.
//
// Module overview:
// - `config.rs`:    `ServerConfig` and its defaults.
// - `error.rs`:     `RegistryError` and `ClientError`.
// - `queue.rs`:     bounded action queue (many producers, one consumer) and
//                   per-player output queues.
// - `registry.rs`:  ordered, mutex-guarded username registry.
// - `rules.rs`:     card sources, dealer rule, round resolution.
// - `game.rs`:      the game loop and its round state machine.
// - `service.rs`:   per-connection handlers: subscribe + push pump, unary
//                   actions, disconnect cleanup.
// - `server.rs`:    TCP listener and thread wiring (`start_server`).
// - `client.rs`:    blocking client used by the console and the tests.
//
// Wire types and framing live in `blackjack_protocol`.

pub mod client;
pub mod config;
pub mod error;
pub mod game;
pub mod queue;
pub mod registry;
pub mod rules;
pub mod server;
pub mod service;

pub use client::{BlackjackClient, Subscription};
pub use config::ServerConfig;
pub use error::{ClientError, RegistryError};
pub use server::{ServerHandle, start_server, start_server_with_shoe};
