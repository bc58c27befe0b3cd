// Protocol messages for client-server communication.
//
// Every TCP connection opens with exactly one `ClientMessage`, which selects
// the call:
// - `Subscribe`: the connection becomes a long-lived push stream. The server
//   answers `Subscribed` (or `Rejected`) and then streams `Event` and
//   `NeedsInput` messages until the player leaves or disconnects.
// - `PerformAction`: a unary call. The server enqueues the action, answers
//   `Ack`, and closes.
//
// Broadcasts are structured `GameEvent`s rather than preformatted text. The
// `Display` impl on `GameEvent` is the presentation layer. Clients format
// events for their users, the server never does.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cards::{Card, Hand};
use crate::types::{ClientAction, RejectReason};

/// First (and only) message a client sends on a connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join the table and receive a push stream.
    Subscribe { username: String },
    /// Submit one action for the game loop.
    PerformAction { action: ClientAction },
}

/// Messages sent by the server to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Subscription accepted; events follow on this connection.
    Subscribed,
    /// Subscription refused. The server closes the connection after this.
    Rejected { reason: RejectReason },
    /// Something happened at the table.
    Event { event: GameEvent },
    /// It is the receiving player's turn; reply with a PerformAction call.
    NeedsInput,
    /// Reply to PerformAction.
    Ack,
}

/// A structured table announcement, broadcast to every registered player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    RoundStarting { players: usize },
    DealerShows { card: Card },
    DealerBlackjack,
    Dealt { username: String, hand: Hand },
    TurnStarted { username: String, hand: Hand },
    Hit { username: String, hand: Hand },
    Busted { username: String },
    Stood { username: String, hand: Hand },
    PlayerLeft { username: String },
    DealerTurn,
    DealerHas { hand: Hand },
    DealerDrew { hand: Hand },
    DealerFinal { hand: Hand },
    DealerBusted,
    Won { username: String },
    Lost { username: String },
    RoundOver,
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoundStarting { players } => {
                write!(f, "Starting a new game of Blackjack with {players} player(s).")
            }
            Self::DealerShows { card } => {
                write!(f, "Dealers hand is dealt, showing a {card}.")
            }
            Self::DealerBlackjack => f.write_str("Dealer got blackjack, everyone lost!"),
            Self::Dealt { username, hand } => write!(f, "{username} got dealt {hand}."),
            Self::TurnStarted { username, hand } => {
                write!(f, "It is {username}'s turn, they have a: {hand}")
            }
            Self::Hit { username, hand } => {
                write!(f, "{username} just hit! They now have: {hand}")
            }
            Self::Busted { username } => write!(f, "{username} busted!"),
            Self::Stood { username, hand } => write!(f, "{username} just stood on: {hand}"),
            Self::PlayerLeft { username } => {
                write!(f, "{username} left the game, restarting the round!")
            }
            Self::DealerTurn => {
                f.write_str("Everyone is finished playing, it is now the dealers turn.")
            }
            Self::DealerHas { hand } => write!(f, "The dealer has: {hand}"),
            Self::DealerDrew { hand } => {
                write!(f, "The dealer took another card, they now have: {hand}")
            }
            Self::DealerFinal { hand } => write!(f, "The dealer ended up with: {hand}"),
            Self::DealerBusted => f.write_str("The dealer busted!"),
            Self::Won { username } => write!(f, "{username} won!"),
            Self::Lost { username } => write!(f, "{username} lost."),
            Self::RoundOver => f.write_str("The game is now over, restarting..."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_render_console_text() {
        let hand = Hand::from_cards(vec![Card::new(10), Card::new(2), Card::new(5)]);
        let hit = GameEvent::Hit {
            username: "bob".into(),
            hand,
        };
        assert_eq!(
            hit.to_string(),
            "bob just hit! They now have: [10] [2] [5] (Value: 17)"
        );

        let left = GameEvent::PlayerLeft {
            username: "carol".into(),
        };
        assert_eq!(
            left.to_string(),
            "carol left the game, restarting the round!"
        );

        assert_eq!(
            GameEvent::DealerShows { card: Card::new(13) }.to_string(),
            "Dealers hand is dealt, showing a [10]."
        );
    }

    #[test]
    fn event_json_keeps_structure() {
        let msg = ServerMessage::Event {
            event: GameEvent::Won {
                username: "alice".into(),
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["Event"]["event"]["Won"]["username"], "alice");
    }
}
