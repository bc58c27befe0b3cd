// Connection handlers: the bridge between sockets and the game.
//
// `BlackjackService` holds the two shared structures a handler touches, the
// registry and the producer side of the action queue. It is cloned into every
// connection thread.
//
// A connection's first frame picks the call:
//
// - Subscribe: register the player, answer `Subscribed`, then become the
//   player's push pump: pop from the output queue, write to the socket,
//   repeat. A separate watcher thread blocks reading the same socket so a
//   client that vanishes while the pump is idle is still noticed.
// - PerformAction: enqueue the action as-is, answer `Ack`, close. All turn
//   validation happens in the game loop.
//
// Disconnect recovery is the critical path. Whichever of the pump (write
// failed) or the watcher (read hit EOF/reset) notices first runs
// `disconnect`, guarded by the `Link::gone` flag so it happens once. It
// deregisters this registration and, if that actually removed someone, submits
// a synthetic LEAVE (`Action::Disconnected`) carrying the registration id. The
// game loop may be blocked waiting on exactly this player; the LEAVE is what
// wakes it.
//
// A pump whose queue closes (the loop removed the player after an explicit
// LEAVE) marks the link gone and shuts the socket down, which also ends the
// watcher.
//
// Every live subscription socket is also kept in `sockets` so `close_all` can
// shut them down on server stop. That fails any write a pump is stuck in,
// which in turn frees a game loop blocked pushing to that pump's full queue.

use std::collections::HashMap;
use std::io::{BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use blackjack_protocol::framing::{self, read_frame};
use blackjack_protocol::{ClientAction, ClientMessage, FrameError, RejectReason, ServerMessage};
use tracing::{debug, info, warn};

use crate::error::RegistryError;
use crate::queue::{Action, ActionSender, OutputReceiver};
use crate::registry::{PlayerId, Registry};

/// How long a new connection has to send its first frame.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// One live subscription's identity plus its exactly-once teardown flag.
pub struct Link {
    id: PlayerId,
    username: String,
    gone: AtomicBool,
}

/// A registered player whose pump has not started yet.
pub struct Subscriber {
    pub link: Arc<Link>,
    inbox: OutputReceiver,
}

/// Why a push pump stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PumpExit {
    /// The player was removed; their queue closed.
    Closed,
    /// The client hung up.
    Disconnected,
    /// Some other transport failure ended the stream.
    Failed,
}

#[derive(Clone)]
pub struct BlackjackService {
    registry: Registry,
    actions: ActionSender,
    sockets: Arc<Mutex<HashMap<PlayerId, TcpStream>>>,
}

impl BlackjackService {
    pub fn new(registry: Registry, actions: ActionSender) -> Self {
        Self {
            registry,
            actions,
            sockets: Arc::default(),
        }
    }

    /// Register `username` and return the handle its pump will drain.
    pub fn subscribe(&self, username: &str) -> Result<Subscriber, RegistryError> {
        let registration = self.registry.register(username)?;
        Ok(Subscriber {
            link: Arc::new(Link {
                id: registration.id,
                username: username.to_owned(),
                gone: AtomicBool::new(false),
            }),
            inbox: registration.inbox,
        })
    }

    /// Hand a client's action to the game loop verbatim.
    pub fn perform_action(&self, action: ClientAction) {
        debug!(username = %action.username, kind = ?action.kind, "action submitted");
        if !self.actions.submit(action) {
            warn!("game loop is gone, action dropped");
        }
    }

    /// Tear down a subscription. Idempotent; only the first call per link
    /// has any effect.
    pub fn disconnect(&self, link: &Link) {
        if link.gone.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.registry.deregister_id(link.id) {
            info!(username = %link.username, "player disconnected, submitting leave");
            let notice = Action::Disconnected {
                id: link.id,
                username: link.username.clone(),
            };
            if !self.actions.submit(notice) {
                warn!("game loop is gone, disconnect notice dropped");
            }
        }
    }

    /// Shut down every live subscription socket. Pumps and watchers then
    /// fail and run their normal teardown.
    pub fn close_all(&self) {
        let sockets = self.lock_sockets();
        for stream in sockets.values() {
            stream.shutdown(Shutdown::Both).ok();
        }
        info!(count = sockets.len(), "closed subscription sockets");
    }

    fn track(&self, id: PlayerId, stream: &TcpStream) {
        if let Ok(clone) = stream.try_clone() {
            self.lock_sockets().insert(id, clone);
        }
    }

    fn untrack(&self, id: PlayerId) {
        self.lock_sockets().remove(&id);
    }

    fn lock_sockets(&self) -> MutexGuard<'_, HashMap<PlayerId, TcpStream>> {
        self.sockets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forward queued messages to `writer` until the queue closes or a write
    /// fails. A failed write runs `disconnect`.
    pub fn pump<W: Write>(&self, subscriber: Subscriber, writer: &mut W) -> PumpExit {
        let Subscriber { link, inbox } = subscriber;
        while let Some(msg) = inbox.pop() {
            if let Err(e) = framing::send(writer, &msg) {
                let exit = if e.is_unavailable() {
                    info!(username = %link.username, "client unavailable");
                    PumpExit::Disconnected
                } else {
                    warn!(username = %link.username, error = %e, "push stream failed");
                    PumpExit::Failed
                };
                self.disconnect(&link);
                return exit;
            }
        }
        link.gone.store(true, Ordering::SeqCst);
        debug!(username = %link.username, "output queue closed");
        PumpExit::Closed
    }

    /// Serve one accepted TCP connection to completion. Runs on its own
    /// thread; never panics the caller on a misbehaving client.
    pub fn handle_connection(&self, stream: TcpStream) {
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)).ok();
        let Ok(read_half) = stream.try_clone() else {
            return;
        };
        let mut reader = BufReader::new(read_half);

        let first: ClientMessage = match framing::recv(&mut reader) {
            Ok(msg) => msg,
            Err(FrameError::Json(e)) => {
                debug!(error = %e, "malformed first message");
                reply(
                    &stream,
                    &ServerMessage::Rejected {
                        reason: RejectReason::UnexpectedMessage,
                    },
                );
                return;
            }
            Err(e) => {
                debug!(error = %e, "connection closed before first message");
                return;
            }
        };

        match first {
            ClientMessage::Subscribe { username } => {
                self.serve_subscription(stream, reader, &username)
            }
            ClientMessage::PerformAction { action } => {
                self.perform_action(action);
                reply(&stream, &ServerMessage::Ack);
            }
        }
    }

    fn serve_subscription(&self, stream: TcpStream, reader: BufReader<TcpStream>, username: &str) {
        let subscriber = match self.subscribe(username) {
            Ok(s) => s,
            Err(e) => {
                info!(username, error = %e, "subscription refused");
                if let Some(reason) = e.reject_reason() {
                    reply(&stream, &ServerMessage::Rejected { reason });
                }
                return;
            }
        };
        let link = subscriber.link.clone();

        let Ok(write_half) = stream.try_clone() else {
            self.disconnect(&link);
            return;
        };
        let mut writer = BufWriter::new(write_half);
        if let Err(e) = framing::send(&mut writer, &ServerMessage::Subscribed) {
            debug!(username, error = %e, "lost client during subscribe");
            self.disconnect(&link);
            return;
        }

        stream.set_read_timeout(None).ok();
        self.track(link.id, &stream);
        let watcher = {
            let service = self.clone();
            let link = link.clone();
            thread::spawn(move || service.watch(reader, &link))
        };

        let exit = self.pump(subscriber, &mut writer);
        debug!(username, ?exit, "push pump finished");
        stream.shutdown(Shutdown::Both).ok();
        let _ = watcher.join();
        self.untrack(link.id);
    }

    /// Block reading the subscription socket until it fails. Clients never
    /// send on this connection, so any frame is ignored and any error means
    /// the connection is done.
    fn watch(&self, mut reader: BufReader<TcpStream>, link: &Link) {
        loop {
            match read_frame(&mut reader) {
                Ok(_) => debug!(username = %link.username, "ignoring frame on push stream"),
                Err(e) => {
                    if !link.gone.load(Ordering::SeqCst) {
                        debug!(username = %link.username, error = %e, "push stream closed");
                    }
                    break;
                }
            }
        }
        self.disconnect(link);
    }
}

/// Best-effort single reply on a connection that is about to close.
fn reply(stream: &TcpStream, msg: &ServerMessage) {
    let mut writer = BufWriter::new(stream);
    if let Err(e) = framing::send(&mut writer, msg) {
        debug!(error = %e, "failed to send reply");
    }
}
