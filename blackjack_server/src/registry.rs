// Player registry: the ordered set of subscribed players.
//
// Registration order is turn order. Each entry owns the sending half of that
// player's output queue; the receiving half goes back to the connection
// handler that registered it, along with a `PlayerId`. Usernames can be
// reused once freed, so a connection tears down its own registration by id,
// never by name. A late disconnect must not evict a newer player who took
// the same name.
//
// Concurrency: one `Mutex<Players>` behind an `Arc`, so `Registry` is a
// cheap cloneable handle shared by the game loop and every connection
// thread. Register and deregister come from connection threads (and the loop,
// on LEAVE) at arbitrary times. The loop never iterates the live list. It
// takes a `snapshot()` at the top of each round and walks that, so a removal
// mid-round cannot shift the index it is on. Nothing blocks while the lock is
// held: snapshots clone the sender handles and callers push afterwards.
//
// A panic on some connection thread while holding the lock must not wedge the
// game, so poisoned locks are recovered rather than propagated. The list
// is never left half-modified by any operation here.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::error::RegistryError;
use crate::queue::{OutputReceiver, OutputSender, output_queue};

/// Registry-assigned identity of one registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlayerId(pub u64);

/// A player as seen by the game loop: name plus a handle to their queue.
#[derive(Clone)]
pub struct PlayerHandle {
    pub id: PlayerId,
    pub username: String,
    pub outbox: OutputSender,
}

/// What a successful `register` hands back to the connection handler.
pub struct Registration {
    pub id: PlayerId,
    pub inbox: OutputReceiver,
}

struct Players {
    entries: Vec<PlayerHandle>,
    next_id: u64,
}

/// Shared, ordered username → output-queue registry.
#[derive(Clone)]
pub struct Registry {
    players: Arc<Mutex<Players>>,
    queue_capacity: usize,
}

impl Registry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            players: Arc::new(Mutex::new(Players {
                entries: Vec::new(),
                next_id: 0,
            })),
            queue_capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Players> {
        self.players.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a player at the end of the turn order.
    pub fn register(&self, username: &str) -> Result<Registration, RegistryError> {
        if username.trim().is_empty() {
            return Err(RegistryError::InvalidUsername);
        }
        let mut players = self.lock();
        if players.entries.iter().any(|p| p.username == username) {
            debug!(username, "registration refused, name taken");
            return Err(RegistryError::AlreadyExists(username.to_owned()));
        }
        let id = PlayerId(players.next_id);
        players.next_id += 1;
        let (outbox, inbox) = output_queue(self.queue_capacity);
        players.entries.push(PlayerHandle {
            id,
            username: username.to_owned(),
            outbox,
        });
        info!(username, players = players.entries.len(), "registered player");
        Ok(Registration { id, inbox })
    }

    /// Remove a player by name. Returns whether anyone was removed; removing
    /// an absent name is a no-op.
    pub fn deregister(&self, username: &str) -> bool {
        self.remove_where(|p| p.username == username)
    }

    /// Remove one specific registration. No-op if it is already gone, even
    /// when someone else now holds the same username.
    pub fn deregister_id(&self, id: PlayerId) -> bool {
        self.remove_where(|p| p.id == id)
    }

    fn remove_where(&self, pred: impl Fn(&PlayerHandle) -> bool) -> bool {
        let mut players = self.lock();
        let Some(idx) = players.entries.iter().position(pred) else {
            return false;
        };
        let removed = players.entries.remove(idx);
        info!(
            username = %removed.username,
            players = players.entries.len(),
            "unregistered player"
        );
        true
    }

    /// Position of `username` in the current turn order.
    pub fn lookup(&self, username: &str) -> Result<usize, RegistryError> {
        self.lock()
            .entries
            .iter()
            .position(|p| p.username == username)
            .ok_or_else(|| RegistryError::NotFound(username.to_owned()))
    }

    pub fn contains(&self, username: &str) -> bool {
        self.lookup(username).is_ok()
    }

    /// Whether this exact registration is still present.
    pub fn contains_id(&self, id: PlayerId) -> bool {
        self.lock().entries.iter().any(|p| p.id == id)
    }

    /// Ordered copy of the current players.
    pub fn snapshot(&self) -> Vec<PlayerHandle> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use blackjack_protocol::ServerMessage;

    use super::*;

    #[test]
    fn register_preserves_order() {
        let registry = Registry::new(4);
        let _a = registry.register("alice").unwrap();
        let _b = registry.register("bob").unwrap();
        let _c = registry.register("carol").unwrap();

        let names: Vec<_> = registry
            .snapshot()
            .into_iter()
            .map(|p| p.username)
            .collect();
        assert_eq!(names, ["alice", "bob", "carol"]);
        assert_eq!(registry.lookup("bob"), Ok(1));
    }

    #[test]
    fn duplicate_username_rejected() {
        let registry = Registry::new(4);
        let _a = registry.register("alice").unwrap();
        assert_eq!(
            registry.register("alice").err(),
            Some(RegistryError::AlreadyExists("alice".into()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn blank_username_rejected() {
        let registry = Registry::new(4);
        assert_eq!(registry.register("  ").err(), Some(RegistryError::InvalidUsername));
        assert!(registry.is_empty());
    }

    #[test]
    fn deregister_absent_is_noop() {
        let registry = Registry::new(4);
        let _a = registry.register("alice").unwrap();
        assert!(!registry.deregister("nobody"));
        assert!(registry.deregister("alice"));
        assert!(!registry.deregister("alice"));
        assert_eq!(
            registry.lookup("alice"),
            Err(RegistryError::NotFound("alice".into()))
        );
    }

    #[test]
    fn removal_shifts_turn_order_but_not_snapshots() {
        let registry = Registry::new(4);
        let _a = registry.register("alice").unwrap();
        let _b = registry.register("bob").unwrap();
        let _c = registry.register("carol").unwrap();

        let snapshot = registry.snapshot();
        registry.deregister("alice");

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[1].username, "bob");
        assert_eq!(registry.lookup("carol"), Ok(1));
    }

    #[test]
    fn name_is_reusable_after_deregister() {
        let registry = Registry::new(4);
        let _first = registry.register("alice").unwrap();
        registry.deregister("alice");
        assert!(registry.register("alice").is_ok());
    }

    #[test]
    fn stale_id_does_not_evict_new_holder_of_name() {
        let registry = Registry::new(4);
        let first = registry.register("alice").unwrap();
        assert!(registry.deregister("alice"));
        let second = registry.register("alice").unwrap();
        assert_ne!(first.id, second.id);

        assert!(!registry.deregister_id(first.id));
        assert!(registry.contains("alice"));
        assert!(!registry.contains_id(first.id));
        assert!(registry.contains_id(second.id));
        assert!(registry.deregister_id(second.id));
        assert!(registry.is_empty());
    }

    #[test]
    fn outbox_reaches_registered_inbox() {
        let registry = Registry::new(4);
        let inbox = registry.register("alice").unwrap().inbox;
        for player in registry.snapshot() {
            assert!(player.outbox.push(ServerMessage::NeedsInput));
        }
        assert_eq!(inbox.pop(), Some(ServerMessage::NeedsInput));
    }

    #[test]
    fn pump_sees_close_after_deregister() {
        let registry = Registry::new(4);
        let inbox = registry.register("alice").unwrap().inbox;
        registry.deregister("alice");
        assert_eq!(inbox.pop(), None);
    }

    #[test]
    fn concurrent_registration_of_same_name_has_one_winner() {
        const THREADS: usize = 16;
        let registry = Registry::new(4);
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    registry.register("alice").map(|_registration| ())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let collisions = results
            .iter()
            .filter(|r| matches!(r, Err(RegistryError::AlreadyExists(_))))
            .count();
        assert_eq!(winners, 1);
        assert_eq!(collisions, THREADS - 1);
        assert_eq!(registry.len(), 1);
    }
}
