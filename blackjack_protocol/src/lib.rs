// blackjack_protocol: wire protocol for the multiplayer blackjack server.
//
// Defines the card model, action types, table events, message enums, and the
// framing codec used by the server (`blackjack_server`) and its clients over
// TCP. Shared by both sides; no threads, no sockets.
//
// Module overview:
// - `cards.rs`:    `Card` and `Hand`: values, totals, bust flag, display.
// - `types.rs`:    `ActionKind`, `ClientAction`, `RejectReason`.
// - `message.rs`:  `ClientMessage`, `ServerMessage`, and the structured
//                  `GameEvent` broadcast vocabulary.
// - `framing.rs`:  4-byte big-endian length prefix + JSON payload over any
//                  `Read`/`Write`.
//
// JSON keeps frames human-readable when debugging with a packet capture; the
// messages are tiny so size is irrelevant.

pub mod cards;
pub mod framing;
pub mod message;
pub mod types;

pub use cards::{Card, Hand};
pub use framing::{FrameError, MAX_FRAME_SIZE, recv, send};
pub use message::{ClientMessage, GameEvent, ServerMessage};
pub use types::{ActionKind, ClientAction, RejectReason, UnknownAction};
