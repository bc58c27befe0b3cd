// Blocking TCP client for the blackjack server.
//
// Used by the `client` binary and the integration tests. Each call opens its
// own connection, mirroring the server's one-call-per-connection protocol:
//
// - `BlackjackClient::subscribe` connects, sends `Subscribe`, and waits for
//   `Subscribed` or `Rejected`. On success the connection becomes a
//   `Subscription`, a blocking iterator over pushed `ServerMessage`s.
// - `BlackjackClient::perform_action` connects, sends `PerformAction`, waits
//   for `Ack`, and closes.
//
// Dropping a `Subscription` closes its socket; the server treats that as the
// player leaving.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use blackjack_protocol::framing;
use blackjack_protocol::{ActionKind, ClientAction, ClientMessage, ServerMessage};
use tracing::debug;

use crate::error::ClientError;

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection parameters for talking to one server.
#[derive(Clone, Debug)]
pub struct BlackjackClient {
    addr: SocketAddr,
}

impl BlackjackClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Join the table as `username`. Fails with `ClientError::AlreadyExists`
    /// when the name is taken.
    pub fn subscribe(&self, username: &str) -> Result<Subscription, ClientError> {
        let (stream, mut reader) = self.call(&ClientMessage::Subscribe {
            username: username.to_owned(),
        })?;
        match framing::recv(&mut reader)? {
            ServerMessage::Subscribed => {
                stream.set_read_timeout(None).ok();
                debug!(username, "subscribed");
                Ok(Subscription {
                    username: username.to_owned(),
                    stream,
                    reader,
                })
            }
            ServerMessage::Rejected { reason } => Err(reason.into()),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    /// Submit one action. Returns once the server has queued it.
    pub fn perform_action(&self, username: &str, kind: ActionKind) -> Result<(), ClientError> {
        let (_stream, mut reader) = self.call(&ClientMessage::PerformAction {
            action: ClientAction::new(username, kind),
        })?;
        match framing::recv(&mut reader)? {
            ServerMessage::Ack => Ok(()),
            ServerMessage::Rejected { reason } => Err(reason.into()),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    /// Open a connection and send its first frame.
    fn call(&self, msg: &ClientMessage) -> Result<(TcpStream, BufReader<TcpStream>), ClientError> {
        let stream = TcpStream::connect(self.addr).map_err(ClientError::Connect)?;
        stream
            .set_read_timeout(Some(RESPONSE_TIMEOUT))
            .map_err(ClientError::Connect)?;
        let read_half = stream.try_clone().map_err(ClientError::Connect)?;
        let mut writer = BufWriter::new(&stream);
        framing::send(&mut writer, msg)?;
        drop(writer);
        Ok((stream, BufReader::new(read_half)))
    }
}

/// A live push stream for one player.
pub struct Subscription {
    username: String,
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Subscription {
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Block until the server pushes the next message. An error means the
    /// stream is over.
    pub fn recv(&mut self) -> Result<ServerMessage, ClientError> {
        Ok(framing::recv(&mut self.reader)?)
    }

    /// Bound how long `recv` may block. `None` waits forever.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), ClientError> {
        self.stream
            .set_read_timeout(timeout)
            .map_err(ClientError::Connect)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stream.shutdown(Shutdown::Both).ok();
    }
}
