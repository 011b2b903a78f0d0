use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use super::{
    constants::{self, HEART_POINTS, NUM_PLAYERS, QUEEN_OF_SPADES_POINTS},
    errors::CardError,
};

/// Card suits. The discriminant is the suit's offset in a card number.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[repr(u8)]
pub enum Suit {
    Heart = 0,
    Club = 1,
    Diamond = 2,
    Spade = 3,
    Joker = 4,
}

impl Suit {
    /// The four suits of a standard deck.
    pub const STANDARD: [Suit; 4] = [Suit::Heart, Suit::Club, Suit::Diamond, Suit::Spade];

    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Heart),
            1 => Some(Self::Club),
            2 => Some(Self::Diamond),
            3 => Some(Self::Spade),
            4 => Some(Self::Joker),
            _ => None,
        }
    }

    pub const fn index(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Heart => "♥",
            Self::Club => "♣",
            Self::Diamond => "♦",
            Self::Spade => "♠",
            Self::Joker => "*",
        };
        write!(f, "{repr}")
    }
}

/// Card ranks. Aces are high. The two joker ranks only pair with
/// [`Suit::Joker`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[repr(u8)]
pub enum Rank {
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
    Ten = 10,
    Jack = 11,
    Queen = 12,
    King = 13,
    Ace = 14,
    BlackJoker = 15,
    RedJoker = 16,
}

impl Rank {
    pub const STANDARD: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    pub const fn from_value(value: u8) -> Option<Self> {
        match value {
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            4 => Some(Self::Four),
            5 => Some(Self::Five),
            6 => Some(Self::Six),
            7 => Some(Self::Seven),
            8 => Some(Self::Eight),
            9 => Some(Self::Nine),
            10 => Some(Self::Ten),
            11 => Some(Self::Jack),
            12 => Some(Self::Queen),
            13 => Some(Self::King),
            14 => Some(Self::Ace),
            15 => Some(Self::BlackJoker),
            16 => Some(Self::RedJoker),
            _ => None,
        }
    }

    pub const fn value(self) -> u8 {
        self as u8
    }

    pub const fn is_joker(self) -> bool {
        matches!(self, Self::BlackJoker | Self::RedJoker)
    }
}

impl TryFrom<u8> for Rank {
    type Error = CardError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or(CardError::InvalidRank(value))
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self {
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
            Self::Ace => "A",
            Self::BlackJoker => "B",
            Self::RedJoker => "R",
            rank => &rank.value().to_string(),
        };
        write!(f, "{value}")
    }
}

/// Which deck a card number is interpreted against.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum DeckVariant {
    /// 52 cards, no jokers. Hearts is always dealt from this deck.
    #[default]
    Standard,
    /// 52 cards plus the two jokers.
    WithJokers,
}

impl DeckVariant {
    pub const fn size(self) -> u8 {
        match self {
            Self::Standard => 52,
            Self::WithJokers => 54,
        }
    }
}

/// An immutable playing card.
///
/// Every card maps to exactly one number in `0..54`. Standard cards are
/// numbered `(rank - 2) * 4 + suit` and the jokers take 52 and 53.
/// Equality and hashing go through that number. Cards order by suit first
/// and rank second so sorted hands group by suit.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(into = "u8")]
pub struct Card {
    rank: Rank,
    suit: Suit,
}

impl Card {
    pub const TWO_OF_CLUBS: Card = Card {
        rank: Rank::Two,
        suit: Suit::Club,
    };

    pub const QUEEN_OF_SPADES: Card = Card {
        rank: Rank::Queen,
        suit: Suit::Spade,
    };

    /// Build a card from its rank and suit.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::InvalidCard`] when a joker rank is paired with
    /// a regular suit or a regular rank with the joker suit.
    pub fn new(rank: Rank, suit: Suit) -> Result<Self, CardError> {
        if rank.is_joker() != (suit == Suit::Joker) {
            return Err(CardError::InvalidCard {
                rank: rank.value(),
                suit,
            });
        }
        Ok(Self { rank, suit })
    }

    /// Build a card from its canonical number.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::InvalidNumber`] when the number falls outside
    /// the variant's deck.
    pub fn from_number(number: i64, variant: DeckVariant) -> Result<Self, CardError> {
        let limit = variant.size();
        let invalid = CardError::InvalidNumber { number, limit };
        let Ok(number) = u8::try_from(number) else {
            return Err(invalid);
        };
        if number >= limit {
            return Err(invalid);
        }
        if number < 52 {
            let rank = Rank::from_value(number / 4 + 2).ok_or(invalid.clone())?;
            let suit = Suit::from_index(number % 4).ok_or(invalid)?;
            Ok(Self { rank, suit })
        } else {
            let rank = Rank::from_value(number - 52 + Rank::BlackJoker.value()).ok_or(invalid)?;
            Ok(Self {
                rank,
                suit: Suit::Joker,
            })
        }
    }

    pub const fn number(self) -> u8 {
        if self.rank.is_joker() {
            52 + self.rank.value() - Rank::BlackJoker.value()
        } else {
            (self.rank.value() - 2) * 4 + self.suit.index()
        }
    }

    pub const fn rank(self) -> Rank {
        self.rank
    }

    pub const fn suit(self) -> Suit {
        self.suit
    }

    /// Points the card is worth to whoever takes it.
    pub const fn points(self) -> u32 {
        match (self.suit, self.rank) {
            (Suit::Heart, _) => HEART_POINTS,
            (Suit::Spade, Rank::Queen) => QUEEN_OF_SPADES_POINTS,
            _ => 0,
        }
    }

    pub const fn is_point_card(self) -> bool {
        self.points() > 0
    }
}

impl PartialEq for Card {
    fn eq(&self, other: &Self) -> bool {
        self.number() == other.number()
    }
}

impl Eq for Card {}

impl Hash for Card {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number().hash(state);
    }
}

impl Ord for Card {
    fn cmp(&self, other: &Self) -> Ordering {
        self.suit
            .cmp(&other.suit)
            .then_with(|| self.rank.cmp(&other.rank))
    }
}

impl PartialOrd for Card {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Card> for u8 {
    fn from(card: Card) -> Self {
        card.number()
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let number = u8::deserialize(deserializer)?;
        Self::from_number(number.into(), DeckVariant::WithJokers).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.rank {
            Rank::BlackJoker => write!(f, "B*"),
            Rank::RedJoker => write!(f, "R*"),
            rank => write!(f, "{rank}{}", self.suit),
        }
    }
}

/// A seat's cards, kept in canonical order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, card: Card) {
        let idx = self.cards.partition_point(|c| c < &card);
        self.cards.insert(idx, card);
    }

    /// Removes one copy of the card. Returns whether it was held.
    pub fn remove(&mut self, card: Card) -> bool {
        match self.cards.iter().position(|c| *c == card) {
            Some(idx) => {
                self.cards.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    pub fn contains(&self, card: Card) -> bool {
        self.cards.contains(&card)
    }

    pub fn has_suit(&self, suit: Suit) -> bool {
        self.cards.iter().any(|c| c.suit() == suit)
    }

    /// Whether every card in the hand is of the given suit.
    pub fn only_suit(&self, suit: Suit) -> bool {
        self.cards.iter().all(|c| c.suit() == suit)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Card numbers in hand order, as sent over the wire.
    pub fn numbers(&self) -> Vec<i64> {
        self.cards.iter().map(|c| i64::from(c.number())).collect()
    }
}

impl FromIterator<Card> for Hand {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        let mut cards: Vec<Card> = iter.into_iter().collect();
        cards.sort();
        Self { cards }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = self
            .cards
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{repr}")
    }
}

/// Cards for a single round. A deck is built fresh, shuffled, and then
/// consumed by exactly one deal.
#[derive(Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// An unshuffled deck in card-number order.
    pub fn new(variant: DeckVariant) -> Self {
        let cards = (0..variant.size())
            .filter_map(|n| Card::from_number(n.into(), variant).ok())
            .collect();
        Self { cards }
    }

    pub fn shuffled(variant: DeckVariant) -> Self {
        let mut deck = Self::new(variant);
        deck.cards.shuffle(&mut rand::rng());
        deck
    }

    pub fn shuffled_with_seed(variant: DeckVariant, seed: u64) -> Self {
        let mut deck = Self::new(variant);
        deck.cards.shuffle(&mut StdRng::seed_from_u64(seed));
        deck
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Deal the whole deck round-robin, one card at a time starting at
    /// seat 0.
    pub fn deal(self, seats: usize) -> Vec<Hand> {
        let mut hands = vec![Hand::new(); seats];
        if seats == 0 {
            return hands;
        }
        for (i, card) in self.cards.into_iter().enumerate() {
            hands[i % seats].add(card);
        }
        hands
    }
}

/// Type alias for seat positions. Seats are fixed for the whole game and
/// define the turn rotation.
pub type Seat = usize;

/// Next seat in the turn rotation.
pub const fn next_seat(seat: Seat) -> Seat {
    (seat + 1) % NUM_PLAYERS
}

/// Direction the warheads travel in a round.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PassDirection {
    Left,
    Right,
    Across,
    Hold,
}

impl PassDirection {
    /// Direction for a zero-based round number. Rounds cycle left, right,
    /// across, and, when holding is enabled, a fourth round without passing.
    pub const fn for_round(round: usize, hold_rounds: bool) -> Self {
        if hold_rounds {
            match round % 4 {
                0 => Self::Left,
                1 => Self::Right,
                2 => Self::Across,
                _ => Self::Hold,
            }
        } else {
            match round % 3 {
                0 => Self::Left,
                1 => Self::Right,
                _ => Self::Across,
            }
        }
    }

    /// Seat that receives the warheads passed by `seat`.
    pub const fn recipient(self, seat: Seat) -> Seat {
        match self {
            Self::Left => (seat + 1) % NUM_PLAYERS,
            Self::Right => (seat + NUM_PLAYERS - 1) % NUM_PLAYERS,
            Self::Across => (seat + 2) % NUM_PLAYERS,
            Self::Hold => seat,
        }
    }

    pub const fn requires_passing(self) -> bool {
        !matches!(self, Self::Hold)
    }
}

impl fmt::Display for PassDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Across => "across",
            Self::Hold => "hold",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Username(String);

impl Username {
    pub fn new(s: &str) -> Self {
        let mut username: String = s
            .trim()
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .take(constants::MAX_NAME_LENGTH)
            .collect();
        if username.is_empty() {
            username.push_str("anonymous");
        }
        Self(username)
    }

    /// Default name for a seat that never introduced itself.
    pub fn for_seat(seat: Seat) -> Self {
        Self(format!("player_{seat}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<String> for Username {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}
