// Bounded FIFO queues connecting connection handlers and the game loop.
//
// Two kinds, both thin wrappers over `std::sync::mpsc::sync_channel`:
//
// - Action queue: many producers (every unary PerformAction call plus the
//   disconnect path), one consumer (the game loop). Entries are `Action`s:
//   a client's own request, or the server's notice that one specific
//   registration lost its connection. `ActionSender::submit`
//   blocks when the queue is full. `ActionReceiver::take` blocks until an
//   action arrives, waking every `poll` interval only to check the shutdown
//   flag. A turn itself never times out.
//
// - Output queue: one per player. The loop is the only producer (through
//   clones of the registry's `OutputSender`), that player's push pump is the
//   only consumer. `push` blocks when the queue is full and is a silent no-op
//   once the pump has gone. `pop` returns `None` after every sender has been
//   dropped, which is how a pump learns its player was removed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use blackjack_protocol::{ClientAction, ServerMessage};

use crate::registry::PlayerId;

/// Default capacity for both queue kinds.
pub const DEFAULT_CAPACITY: usize = 100;

/// One entry in the action queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Submitted by a client through PerformAction.
    Client(ClientAction),
    /// Synthetic LEAVE for a dropped connection. The registration `id` has
    /// already been removed from the registry; `username` is for
    /// announcements only.
    Disconnected { id: PlayerId, username: String },
}

impl Action {
    pub fn username(&self) -> &str {
        match self {
            Self::Client(action) => &action.username,
            Self::Disconnected { username, .. } => username,
        }
    }
}

impl From<ClientAction> for Action {
    fn from(action: ClientAction) -> Self {
        Self::Client(action)
    }
}

/// Create an action queue with room for `capacity` pending actions.
pub fn action_queue(capacity: usize) -> (ActionSender, ActionReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity);
    (ActionSender { tx }, ActionReceiver { rx })
}

/// Create one player's output queue.
pub fn output_queue(capacity: usize) -> (OutputSender, OutputReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity);
    (OutputSender { tx }, OutputReceiver { rx })
}

/// Producer half of the action queue. Cheap to clone.
#[derive(Clone)]
pub struct ActionSender {
    tx: SyncSender<Action>,
}

impl ActionSender {
    /// Enqueue an action, blocking while the queue is full. Returns false if
    /// the game loop has shut down.
    pub fn submit(&self, action: impl Into<Action>) -> bool {
        self.tx.send(action.into()).is_ok()
    }
}

/// Consumer half of the action queue, owned by the game loop.
pub struct ActionReceiver {
    rx: Receiver<Action>,
}

impl ActionReceiver {
    /// Block until an action arrives. Returns `None` if `keep_running` goes
    /// false (checked every `poll`) or every sender is gone.
    pub fn take(&self, keep_running: &AtomicBool, poll: Duration) -> Option<Action> {
        loop {
            match self.rx.recv_timeout(poll) {
                Ok(action) => return Some(action),
                Err(RecvTimeoutError::Timeout) => {
                    if !keep_running.load(Ordering::SeqCst) {
                        return None;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

/// Producer half of a player's output queue.
#[derive(Clone)]
pub struct OutputSender {
    tx: SyncSender<ServerMessage>,
}

impl OutputSender {
    /// Enqueue a message for the player, blocking while the queue is full.
    /// Returns false if the player's pump has exited.
    pub fn push(&self, msg: ServerMessage) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Consumer half of a player's output queue, owned by that player's pump.
pub struct OutputReceiver {
    rx: Receiver<ServerMessage>,
}

impl OutputReceiver {
    /// Block until a message is available. `None` once all senders dropped.
    pub fn pop(&self) -> Option<ServerMessage> {
        self.rx.recv().ok()
    }

    /// Like `pop`, but gives up after `timeout`. Test helper for reading a
    /// player's stream without a socket.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<ServerMessage> {
        self.rx.recv_timeout(timeout).ok()
    }
}
