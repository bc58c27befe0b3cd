// Card and hand model shared by the server and clients.
//
// Cards carry only a rank; suits never matter for this table. Ranks run 1-13
// with the ace counted low, and face cards count as ten. A `Hand` is an
// append-only list of cards with a derived total and bust flag. Both types
// derive serde so they can travel inside `GameEvent`s unchanged.
//
// The `Display` impls here are the text clients print (`[10] [9] (Value: 19)`).
// The server never formats hands itself; it ships them as structured values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Totals above this are busted.
pub const BUST_LIMIT: u32 = 21;

/// A single playing card. Rank 1 is the ace (counted as one), 11-13 are the
/// face cards.
///
/// The rank is not validated. Values outside 1..=13 are accepted and simply
/// count as `min(rank, 10)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: u8,
}

impl Card {
    pub const fn new(rank: u8) -> Self {
        Self { rank }
    }

    /// Blackjack value of this card: the rank, capped at ten.
    pub const fn value(self) -> u32 {
        if self.rank > 10 { 10 } else { self.rank as u32 }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.value())
    }
}

/// An ordered, append-only set of cards held by a player or the dealer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// The face-up card the dealer shows before players act.
    pub fn first(&self) -> Option<Card> {
        self.cards.first().copied()
    }

    pub fn total(&self) -> u32 {
        self.cards.iter().map(|c| c.value()).sum()
    }

    pub fn is_busted(&self) -> bool {
        self.total() > BUST_LIMIT
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cards.is_empty() {
            return Ok(());
        }
        for (i, card) in self.cards.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{card}")?;
        }
        write!(f, " (Value: {})", self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(ranks: &[u8]) -> Hand {
        Hand::from_cards(ranks.iter().copied().map(Card::new).collect())
    }

    #[test]
    fn face_cards_count_as_ten() {
        assert_eq!(Card::new(1).value(), 1);
        assert_eq!(Card::new(10).value(), 10);
        assert_eq!(Card::new(11).value(), 10);
        assert_eq!(Card::new(13).value(), 10);
    }

    #[test]
    fn total_and_bust() {
        let mut h = hand(&[10, 9]);
        assert_eq!(h.total(), 19);
        assert!(!h.is_busted());

        h.push(Card::new(2));
        assert_eq!(h.total(), 21);
        assert!(!h.is_busted(), "exactly 21 is not a bust");

        h.push(Card::new(1));
        assert_eq!(h.total(), 22);
        assert!(h.is_busted());
    }

    #[test]
    fn king_queen_five_busts() {
        assert!(hand(&[13, 12, 5]).is_busted());
        assert_eq!(hand(&[13, 12, 5]).total(), 25);
    }

    #[test]
    fn empty_hand() {
        let h = Hand::new();
        assert_eq!(h.total(), 0);
        assert_eq!(h.first(), None);
        assert_eq!(h.to_string(), "");
    }

    #[test]
    fn display_matches_console_format() {
        assert_eq!(hand(&[12, 9]).to_string(), "[10] [9] (Value: 19)");
        assert_eq!(Card::new(4).to_string(), "[4]");
    }
}
