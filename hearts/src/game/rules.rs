//! Hearts play and pass rules as pure functions over a hand.
//!
//! The table's [`GameState`](super::state::GameState) and the bots both
//! go through these so a client never disagrees with the server about
//! what's legal.

use std::collections::HashSet;

use super::{
    constants::WARHEAD_COUNT,
    entities::{Card, DeckVariant, Hand, Suit},
    errors::{PlayError, WarheadError},
};

/// What a seat needs to know about the trick in progress to pick a card.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TrickContext {
    /// Card that set the led suit. `None` when the seat is leading.
    pub base_play: Option<Card>,
    pub hearts_broken: bool,
    /// First trick of the round, which must open with the two of clubs.
    pub first_trick: bool,
}

/// Check a single play against the hand and trick context.
///
/// # Errors
///
/// Returns the first rule the play breaks.
pub fn check_play(hand: &Hand, card: Card, ctx: &TrickContext) -> Result<(), PlayError> {
    if !hand.contains(card) {
        return Err(PlayError::NotInHand(card));
    }
    match ctx.base_play {
        Some(base) => {
            let led = base.suit();
            if card.suit() != led && hand.has_suit(led) {
                return Err(PlayError::MustFollowSuit(led));
            }
        }
        None => {
            if ctx.first_trick && hand.contains(Card::TWO_OF_CLUBS) && card != Card::TWO_OF_CLUBS
            {
                return Err(PlayError::MustLeadTwoOfClubs);
            }
            // Leading hearts is allowed once they're broken or when the
            // hand has nothing else.
            if card.suit() == Suit::Heart && !ctx.hearts_broken && !hand.only_suit(Suit::Heart) {
                return Err(PlayError::HeartsNotBroken);
            }
        }
    }
    Ok(())
}

/// Every card in the hand that [`check_play`] accepts.
pub fn legal_plays(hand: &Hand, ctx: &TrickContext) -> Vec<Card> {
    hand.iter()
        .copied()
        .filter(|card| check_play(hand, *card, ctx).is_ok())
        .collect()
}

/// Whether playing `card` takes the lead from `leading`. Only a higher card
/// of the leading card's suit overtakes it.
pub fn overtakes(card: Card, leading: Card) -> bool {
    card.suit() == leading.suit() && card.rank() > leading.rank()
}

/// Decode and validate warhead card numbers against the hand. The hand is
/// never modified.
///
/// # Errors
///
/// Returns an error unless there are exactly three distinct, valid cards
/// that are all held.
pub fn check_warheads(hand: &Hand, numbers: &[i64]) -> Result<[Card; WARHEAD_COUNT], WarheadError> {
    if numbers.len() != WARHEAD_COUNT {
        return Err(WarheadError::WrongCount {
            expected: WARHEAD_COUNT,
            actual: numbers.len(),
        });
    }
    let mut cards = [Card::TWO_OF_CLUBS; WARHEAD_COUNT];
    let mut seen = HashSet::with_capacity(WARHEAD_COUNT);
    for (slot, number) in cards.iter_mut().zip(numbers) {
        let card = Card::from_number(*number, DeckVariant::Standard)?;
        if !seen.insert(card) {
            return Err(WarheadError::Duplicate(card));
        }
        if !hand.contains(card) {
            return Err(WarheadError::NotInHand(card));
        }
        *slot = card;
    }
    Ok(cards)
}
