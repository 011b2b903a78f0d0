//! Game error types for card construction, plays, and passes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{Card, Suit};

/// Errors from building a card out of malformed parts.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum CardError {
    /// Joker rank without the joker suit, or the other way around.
    #[error("invalid card: rank {rank} can't be paired with suit {suit:?}")]
    InvalidCard { rank: u8, suit: Suit },

    /// Card number outside the range of the deck variant in use.
    #[error("invalid card: number {number} is outside 0..{limit}")]
    InvalidNumber { number: i64, limit: u8 },

    /// Rank value that doesn't name any rank.
    #[error("invalid card: no rank has value {0}")]
    InvalidRank(u8),
}

/// Rule violations for a single play. These are recoverable: the same
/// seat is asked to play again.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum PlayError {
    #[error("{0} isn't in your hand")]
    NotInHand(Card),
    #[error("the first trick must be led with the two of clubs")]
    MustLeadTwoOfClubs,
    #[error("must follow {0:?}")]
    MustFollowSuit(Suit),
    #[error("hearts haven't been broken")]
    HeartsNotBroken,
    #[error("not your turn")]
    OutOfTurn,
    #[error("the trick is already complete")]
    TrickComplete,
}

/// Rule violations for a warhead submission. Rejected submissions never
/// touch the hand.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum WarheadError {
    #[error("must pass exactly {expected} cards, got {actual}")]
    WrongCount { expected: usize, actual: usize },
    #[error("{0} is passed more than once")]
    Duplicate(Card),
    #[error("{0} isn't in your hand")]
    NotInHand(Card),
    #[error("{0}")]
    InvalidCard(#[from] CardError),
}
