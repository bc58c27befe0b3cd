// Table rules: where cards come from, when the dealer draws, who wins.
//
// Everything here is pure except the card sources. `dealer_should_draw` and
// `resolve` are plain functions of hands so they can be tested exhaustively
// without a game loop.
//
// Card sources:
// - `RandomShoe`: infinite shoe, each card drawn uniformly from ranks 1-13
//   (with replacement). Backed by ChaCha8 so a fixed seed replays a session.
// - `StackedShoe`: a predetermined sequence, for tests and replays. Once the
//   stack runs out it keeps dealing twos so a test never panics mid-round.

use std::collections::VecDeque;

use blackjack_protocol::{Card, Hand};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The dealer stands on this total or higher.
pub const DEALER_STAND_TOTAL: u32 = 17;

/// Anything that can deal cards to the table.
pub trait CardSource: Send {
    fn draw(&mut self) -> Card;

    /// A fresh two-card hand.
    fn deal_hand(&mut self) -> Hand {
        let first = self.draw();
        let second = self.draw();
        Hand::from_cards(vec![first, second])
    }
}

pub struct RandomShoe {
    rng: ChaCha8Rng,
}

impl RandomShoe {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seeded from the thread RNG; every server run deals differently.
    pub fn unseeded() -> Self {
        Self::from_seed(rand::random())
    }
}

impl CardSource for RandomShoe {
    fn draw(&mut self) -> Card {
        Card::new(self.rng.random_range(1..=13))
    }
}

pub struct StackedShoe {
    cards: VecDeque<Card>,
}

impl StackedShoe {
    /// Deal `ranks` in order.
    pub fn new(ranks: impl IntoIterator<Item = u8>) -> Self {
        Self {
            cards: ranks.into_iter().map(Card::new).collect(),
        }
    }
}

impl CardSource for StackedShoe {
    fn draw(&mut self) -> Card {
        self.cards.pop_front().unwrap_or(Card::new(2))
    }
}

/// The dealer draws while below 17 and not busted.
pub fn dealer_should_draw(dealer: &Hand) -> bool {
    dealer.total() < DEALER_STAND_TOTAL && !dealer.is_busted()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Lose,
}

/// Decide each player's result against the dealer's final hand.
///
/// A busted player always loses. If the dealer busted every other player
/// wins; otherwise a player wins with a total at least the dealer's. Ties go
/// to the player.
pub fn resolve<'a, I>(dealer: &Hand, players: I) -> Vec<(&'a str, Outcome)>
where
    I: IntoIterator<Item = (&'a str, &'a Hand)>,
{
    players
        .into_iter()
        .map(|(name, hand)| (name, outcome(dealer, hand)))
        .collect()
}

fn outcome(dealer: &Hand, player: &Hand) -> Outcome {
    if player.is_busted() {
        Outcome::Lose
    } else if dealer.is_busted() || player.total() >= dealer.total() {
        Outcome::Win
    } else {
        Outcome::Lose
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn hand(ranks: &[u8]) -> Hand {
        Hand::from_cards(ranks.iter().copied().map(Card::new).collect())
    }

    fn arb_hand() -> impl Strategy<Value = Hand> {
        prop::collection::vec(1u8..=13, 2..7).prop_map(|ranks| hand(&ranks))
    }

    #[test]
    fn worked_example() {
        let dealer = hand(&[10, 9]);
        let a = hand(&[10, 9]);
        let b = hand(&[10, 2, 5]);
        let c = hand(&[10, 9, 5]);
        let results = resolve(&dealer, [("A", &a), ("B", &b), ("C", &c)]);
        assert_eq!(
            results,
            vec![("A", Outcome::Win), ("B", Outcome::Lose), ("C", Outcome::Lose)]
        );
    }

    #[test]
    fn dealer_bust_pays_everyone_still_standing() {
        let dealer = hand(&[10, 6, 8]);
        let low = hand(&[2, 3]);
        let bust = hand(&[10, 10, 5]);
        let results = resolve(&dealer, [("low", &low), ("bust", &bust)]);
        assert_eq!(results, vec![("low", Outcome::Win), ("bust", Outcome::Lose)]);
    }

    #[test]
    fn dealer_stops_at_seventeen() {
        assert!(dealer_should_draw(&hand(&[10, 6])));
        assert!(!dealer_should_draw(&hand(&[10, 7])));
        assert!(!dealer_should_draw(&hand(&[10, 10, 5])));
    }

    #[test]
    fn stacked_shoe_deals_in_order_then_twos() {
        let mut shoe = StackedShoe::new([13, 1]);
        assert_eq!(shoe.deal_hand(), hand(&[13, 1]));
        assert_eq!(shoe.draw(), Card::new(2));
    }

    #[test]
    fn seeded_shoe_replays() {
        let mut a = RandomShoe::from_seed(7);
        let mut b = RandomShoe::from_seed(7);
        let draws_a: Vec<_> = (0..32).map(|_| a.draw()).collect();
        let draws_b: Vec<_> = (0..32).map(|_| b.draw()).collect();
        assert_eq!(draws_a, draws_b);
        assert!(draws_a.iter().all(|c| (1..=13).contains(&c.rank)));
    }

    proptest! {
        #[test]
        fn busted_hands_never_win(dealer in arb_hand(), player in arb_hand()) {
            let results = resolve(&dealer, [("p", &player)]);
            if player.is_busted() {
                prop_assert_eq!(results[0].1, Outcome::Lose);
            }
        }

        #[test]
        fn opening_hands_never_total_twenty_one(seed in any::<u64>()) {
            let mut shoe = RandomShoe::from_seed(seed);
            for _ in 0..8 {
                let opening = shoe.deal_hand();
                prop_assert_eq!(opening.cards().len(), 2);
                prop_assert!(opening.total() <= 20);
            }
        }

        #[test]
        fn bust_flag_matches_total(player in arb_hand()) {
            prop_assert_eq!(player.is_busted(), player.total() > 21);
        }

        #[test]
        fn dealer_draw_stops_at_first_stand_total(ranks in prop::collection::vec(1u8..=13, 2..12)) {
            // Replay the dealer rule over a fixed card sequence.
            let mut shoe = StackedShoe::new(ranks);
            let mut dealer = shoe.deal_hand();
            let mut draws = 0;
            while dealer_should_draw(&dealer) {
                let before = dealer.total();
                prop_assert!(before < DEALER_STAND_TOTAL);
                dealer.push(shoe.draw());
                draws += 1;
                prop_assert!(draws < 20);
            }
            prop_assert!(dealer.total() >= DEALER_STAND_TOTAL || dealer.is_busted());
        }

        #[test]
        fn resolution_is_deterministic(
            dealer in arb_hand(),
            players in prop::collection::vec(arb_hand(), 1..6),
        ) {
            let names: Vec<String> = (0..players.len()).map(|i| format!("p{i}")).collect();
            let seats = || names.iter().map(String::as_str).zip(players.iter());
            let first = resolve(&dealer, seats());
            let second = resolve(&dealer, seats());
            prop_assert_eq!(&first, &second);

            for ((_, outcome), hand) in first.iter().zip(&players) {
                let expected = !hand.is_busted()
                    && (dealer.is_busted() || hand.total() >= dealer.total());
                prop_assert_eq!(*outcome == Outcome::Win, expected);
            }
        }
    }
}
