// The authoritative game loop.
//
// One dedicated thread runs `GameLoop::run`. It is the only code that deals
// cards, decides whose turn it is, or resolves a round. Everything it learns
// from the outside world arrives through the action queue; everything it says
// goes out through per-player output queues.
//
// Round structure (`play_round`):
//   Idle:        no players; `run` sleeps `idle_poll` and checks again.
//   Dealing:     snapshot the registry, deal the dealer and every seat.
//   PlayerTurns: for each seat in snapshot order, push NeedsInput and wait
//                (`await_action`) until that seat's own HIT/STAND arrives.
//   DealerTurn:  dealer draws below 17.
//   Resolution:  broadcast win/lose per seat.
//
// Restarts are a `RoundEnd` value returned from `play_round`, never a jump:
// any LEAVE during player turns deregisters the leaver, broadcasts
// `PlayerLeft`, and returns `RoundEnd::Restarted`. The next call takes a fresh
// snapshot, so a table that emptied out falls straight back to Idle.
//
// A client's LEAVE names a username. A dropped connection's synthetic LEAVE
// (`Action::Disconnected`) names a registration instead: the service already
// removed it by id, and the loop only checks whether that registration holds
// a seat. It never deregisters by name, so a newcomer who reused the name is
// left alone.
//
// The seat list is the round's own copy of the registry. Players who join
// mid-round hear broadcasts (broadcasts go to a fresh registry snapshot each
// time) but are only dealt in at the next round.
//
// The loop never waits on a turn with a timeout. A stalled player blocks the
// table until they act, leave, or their connection drops and the service
// submits a synthetic LEAVE. `take` wakes periodically only to observe
// shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use blackjack_protocol::{ActionKind, ClientAction, GameEvent, Hand, ServerMessage};
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::queue::{Action, ActionReceiver};
use crate::registry::{PlayerHandle, PlayerId, Registry};
use crate::rules::{CardSource, Outcome, dealer_should_draw, resolve};

/// How often a blocked `take` re-checks the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Where the loop currently is within a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dealing,
    PlayerTurns,
    DealerTurn,
    Resolution,
}

/// How a call to `play_round` finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundEnd {
    /// Nobody is registered.
    Idle,
    /// The dealer was dealt 21; nobody played.
    DealerBlackjack,
    /// A player left mid-round; turn progress was discarded.
    Restarted,
    /// The round ran through resolution.
    Completed,
    /// `keep_running` went false while waiting.
    Shutdown,
}

/// A player's place at the table for one round.
struct Seat {
    player: PlayerHandle,
    hand: Hand,
}

impl Seat {
    fn username(&self) -> &str {
        &self.player.username
    }
}

/// Result of waiting for the current seat to act.
enum Awaited {
    Act(ActionKind),
    Restart,
    Shutdown,
}

pub struct GameLoop {
    registry: Registry,
    actions: ActionReceiver,
    shoe: Box<dyn CardSource>,
    pacing: Duration,
    idle_poll: Duration,
    keep_running: Arc<AtomicBool>,
    phase: Phase,
}

impl GameLoop {
    pub fn new(
        registry: Registry,
        actions: ActionReceiver,
        shoe: Box<dyn CardSource>,
        config: &ServerConfig,
        keep_running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            registry,
            actions,
            shoe,
            pacing: config.pacing,
            idle_poll: config.idle_poll,
            keep_running,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Play rounds until `keep_running` goes false.
    pub fn run(mut self) {
        info!("game loop started");
        while self.keep_running.load(Ordering::SeqCst) {
            match self.play_round() {
                RoundEnd::Idle => thread::sleep(self.idle_poll),
                RoundEnd::Shutdown => break,
                end => debug!(?end, "round ended"),
            }
        }
        info!("game loop stopped");
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "phase transition");
            self.phase = phase;
        }
    }

    /// Play one round from the deal to resolution, or until a restart.
    pub fn play_round(&mut self) -> RoundEnd {
        let players = self.registry.snapshot();
        if players.is_empty() {
            self.enter(Phase::Idle);
            return RoundEnd::Idle;
        }

        self.enter(Phase::Dealing);
        info!(players = players.len(), "starting round");
        self.broadcast(GameEvent::RoundStarting {
            players: players.len(),
        });

        let mut dealer = self.shoe.deal_hand();
        if let Some(card) = dealer.first() {
            self.broadcast(GameEvent::DealerShows { card });
        }
        // Unreachable while cards count at most ten and aces count one.
        if dealer.total() == 21 {
            self.broadcast(GameEvent::DealerBlackjack);
            return RoundEnd::DealerBlackjack;
        }

        let mut seats: Vec<Seat> = players
            .into_iter()
            .map(|player| Seat {
                player,
                hand: self.shoe.deal_hand(),
            })
            .collect();
        for seat in &seats {
            self.broadcast(GameEvent::Dealt {
                username: seat.username().to_owned(),
                hand: seat.hand.clone(),
            });
        }

        self.enter(Phase::PlayerTurns);
        for current in 0..seats.len() {
            if let Some(end) = self.play_turn(&mut seats, current) {
                return end;
            }
        }

        self.enter(Phase::DealerTurn);
        self.broadcast(GameEvent::DealerTurn);
        self.broadcast(GameEvent::DealerHas {
            hand: dealer.clone(),
        });
        while dealer_should_draw(&dealer) {
            dealer.push(self.shoe.draw());
            self.broadcast(GameEvent::DealerDrew {
                hand: dealer.clone(),
            });
        }
        self.broadcast(GameEvent::DealerFinal {
            hand: dealer.clone(),
        });

        self.enter(Phase::Resolution);
        if dealer.is_busted() {
            self.broadcast(GameEvent::DealerBusted);
        }
        let results = resolve(&dealer, seats.iter().map(|s| (s.username(), &s.hand)));
        for (username, outcome) in results {
            let username = username.to_owned();
            info!(%username, ?outcome, "resolved");
            self.broadcast(match outcome {
                Outcome::Win => GameEvent::Won { username },
                Outcome::Lose => GameEvent::Lost { username },
            });
        }
        self.broadcast(GameEvent::RoundOver);
        RoundEnd::Completed
    }

    /// Run seat `current`'s turn. Returns `Some` if the round must end early.
    fn play_turn(&mut self, seats: &mut [Seat], current: usize) -> Option<RoundEnd> {
        self.broadcast(GameEvent::TurnStarted {
            username: seats[current].username().to_owned(),
            hand: seats[current].hand.clone(),
        });

        loop {
            seats[current].player.outbox.push(ServerMessage::NeedsInput);

            match self.await_action(seats, current) {
                Awaited::Act(ActionKind::Hit) => {
                    let card = self.shoe.draw();
                    let seat = &mut seats[current];
                    seat.hand.push(card);
                    let (username, hand) = (seat.username().to_owned(), seat.hand.clone());
                    let busted = hand.is_busted();
                    self.broadcast(GameEvent::Hit {
                        username: username.clone(),
                        hand,
                    });
                    if busted {
                        self.broadcast(GameEvent::Busted { username });
                        return None;
                    }
                }
                Awaited::Act(ActionKind::Stand) => {
                    let seat = &seats[current];
                    let event = GameEvent::Stood {
                        username: seat.username().to_owned(),
                        hand: seat.hand.clone(),
                    };
                    self.broadcast(event);
                    return None;
                }
                // Leaves are turned into `Restart` by `await_action`.
                Awaited::Act(ActionKind::Leave) | Awaited::Restart => {
                    return Some(RoundEnd::Restarted);
                }
                Awaited::Shutdown => return Some(RoundEnd::Shutdown),
            }
        }
    }

    /// Block until the current seat submits HIT or STAND, or anyone leaves.
    /// Out-of-turn actions are dropped without advancing the turn.
    fn await_action(&mut self, seats: &[Seat], current: usize) -> Awaited {
        let expected = &seats[current].player;
        loop {
            let Some(action) = self.actions.take(&self.keep_running, SHUTDOWN_POLL) else {
                return Awaited::Shutdown;
            };
            let (username, kind) = match action {
                Action::Disconnected { id, username } => {
                    if self.handle_disconnect(seats, id, &username) {
                        return Awaited::Restart;
                    }
                    continue;
                }
                Action::Client(ClientAction { username, kind }) => (username, kind),
            };

            if kind == ActionKind::Leave {
                if self.handle_leave(seats, &username) {
                    return Awaited::Restart;
                }
                continue;
            }

            if username != expected.username {
                debug!(
                    %username,
                    expected = %expected.username,
                    ?kind,
                    "dropping out-of-turn action"
                );
                continue;
            }

            // The player may have vanished while we were blocked. Their
            // synthetic LEAVE is behind this action; act on it now.
            if !self.registry.contains_id(expected.id) {
                info!(%username, "current player gone, restarting round");
                self.broadcast(GameEvent::PlayerLeft { username });
                return Awaited::Restart;
            }

            return Awaited::Act(kind);
        }
    }

    /// Process a client's LEAVE. Returns whether the round must restart.
    ///
    /// A LEAVE for someone neither seated this round nor registered is stale
    /// (their departure already restarted an earlier round) and is dropped.
    fn handle_leave(&mut self, seats: &[Seat], username: &str) -> bool {
        let seated = seats.iter().any(|s| s.username() == username);
        let removed = self.registry.deregister(username);
        if !seated && !removed {
            debug!(username, "dropping stale leave");
            return false;
        }
        info!(username, "player left, restarting round");
        self.broadcast(GameEvent::PlayerLeft {
            username: username.to_owned(),
        });
        true
    }

    /// Process a dropped connection. The registration is already gone from
    /// the registry; the round restarts only if it holds a seat.
    fn handle_disconnect(&mut self, seats: &[Seat], id: PlayerId, username: &str) -> bool {
        if !seats.iter().any(|s| s.player.id == id) {
            debug!(username, ?id, "dropping stale disconnect");
            return false;
        }
        info!(username, "seated player disconnected, restarting round");
        self.broadcast(GameEvent::PlayerLeft {
            username: username.to_owned(),
        });
        true
    }

    /// Push `event` to every currently registered player, then pause so a
    /// human can follow along.
    fn broadcast(&self, event: GameEvent) {
        for player in self.registry.snapshot() {
            player.outbox.push(ServerMessage::Event {
                event: event.clone(),
            });
        }
        if !self.pacing.is_zero() {
            thread::sleep(self.pacing);
        }
    }
}
