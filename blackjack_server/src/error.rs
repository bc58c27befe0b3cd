// Error types for the server and client library.
//
// `RegistryError` covers registration and lookup. `NotFound` is returned to
// callers that ask, but the server itself treats it as a no-op.
// `ClientError` is what the blocking client surfaces; `AlreadyExists` is kept
// as its own variant because the console retries on it.

use blackjack_protocol::{FrameError, RejectReason, ServerMessage};
use thiserror::Error;

/// Errors from the player registry.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("username {0:?} already exists")]
    AlreadyExists(String),
    #[error("username must not be empty")]
    InvalidUsername,
    #[error("no player named {0:?}")]
    NotFound(String),
}

impl RegistryError {
    /// The wire-level reason sent back to a refused subscriber. `None` for
    /// lookup failures, which registration never produces.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::AlreadyExists(_) => Some(RejectReason::AlreadyExists),
            Self::InvalidUsername => Some(RejectReason::InvalidUsername),
            Self::NotFound(_) => None,
        }
    }
}

/// Errors surfaced by `BlackjackClient` and `Subscription`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("username already exists")]
    AlreadyExists,
    #[error("rejected by server: {0}")]
    Rejected(RejectReason),
    #[error("connection failed: {0}")]
    Connect(#[source] std::io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("unexpected response: {0:?}")]
    UnexpectedResponse(ServerMessage),
}

impl From<RejectReason> for ClientError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::AlreadyExists => Self::AlreadyExists,
            other => Self::Rejected(other),
        }
    }
}
