// Action types for the blackjack protocol.
//
// `ClientAction` is the unit of work the game loop consumes: a username plus
// one of three action kinds. The server enqueues actions verbatim from the
// unary PerformAction call and from disconnect detection (a synthetic LEAVE);
// the loop decides whether an action is in turn.
//
// `RejectReason` enumerates why a subscription can be refused, so clients can
// match on the reason instead of parsing text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a player wants to do on their turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Hit,
    Stand,
    Leave,
}

impl ActionKind {
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Stand => "stand",
            Self::Leave => "leave",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Input that is not one of the recognised action keywords.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown action {0:?}, expected 'hit', 'stand' or 'leave'")]
pub struct UnknownAction(pub String);

impl FromStr for ActionKind {
    type Err = UnknownAction;

    /// Parses a console keyword, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hit" => Ok(Self::Hit),
            "stand" => Ok(Self::Stand),
            "leave" => Ok(Self::Leave),
            _ => Err(UnknownAction(s.trim().to_owned())),
        }
    }
}

/// An action submitted on behalf of a player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAction {
    pub username: String,
    pub kind: ActionKind,
}

impl ClientAction {
    pub fn new(username: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            username: username.into(),
            kind,
        }
    }

    /// The LEAVE the server submits when a player's connection drops.
    pub fn leave(username: impl Into<String>) -> Self {
        Self::new(username, ActionKind::Leave)
    }
}

/// Why the server refused a connection's first message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum RejectReason {
    #[error("username already exists")]
    AlreadyExists,
    #[error("username must not be empty")]
    InvalidUsername,
    #[error("unexpected message")]
    UnexpectedMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keywords_case_insensitively() {
        assert_eq!("hit".parse::<ActionKind>(), Ok(ActionKind::Hit));
        assert_eq!("STAND".parse::<ActionKind>(), Ok(ActionKind::Stand));
        assert_eq!("  Leave \n".parse::<ActionKind>(), Ok(ActionKind::Leave));
    }

    #[test]
    fn rejects_unknown_keywords() {
        let err = "double".parse::<ActionKind>().unwrap_err();
        assert_eq!(err, UnknownAction("double".into()));
        assert!("".parse::<ActionKind>().is_err());
    }

    #[test]
    fn keyword_round_trips_through_parse() {
        for kind in [ActionKind::Hit, ActionKind::Stand, ActionKind::Leave] {
            assert_eq!(kind.keyword().parse::<ActionKind>(), Ok(kind));
        }
    }
}
