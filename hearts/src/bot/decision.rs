//! Card choices for bot players.

use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};

use crate::game::{
    constants::WARHEAD_COUNT,
    entities::{Card, Hand},
    rules::{self, TrickContext},
};

/// Picks passes and plays. Plays are uniformly random among the legal
/// ones; passes dump the most dangerous cards.
#[derive(Debug)]
pub struct BotDecisionMaker {
    rng: StdRng,
}

impl BotDecisionMaker {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible choices for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The queen of spades if held, then the highest ranks.
    pub fn choose_warheads(&self, hand: &Hand) -> Option<[Card; WARHEAD_COUNT]> {
        let mut cards = hand.cards().to_vec();
        cards.sort_by_key(|card| std::cmp::Reverse((*card == Card::QUEEN_OF_SPADES, card.rank())));
        cards.truncate(WARHEAD_COUNT);
        cards.try_into().ok()
    }

    /// Any three held cards, for when the server refused the first pick.
    pub fn random_warheads(&mut self, hand: &Hand) -> Option<[Card; WARHEAD_COUNT]> {
        let cards: Vec<Card> = hand
            .cards()
            .choose_multiple(&mut self.rng, WARHEAD_COUNT)
            .copied()
            .collect();
        cards.try_into().ok()
    }

    pub fn choose_play(&mut self, hand: &Hand, ctx: &TrickContext) -> Option<Card> {
        rules::legal_plays(hand, ctx).choose(&mut self.rng).copied()
    }
}

impl Default for BotDecisionMaker {
    fn default() -> Self {
        Self::new()
    }
}
