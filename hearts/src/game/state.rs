//! Shared per-game state owned by the table's coordinating task.
//!
//! Everything that changes while a game is played lives here: hands,
//! collected cards, scores, and the per-trick positions. Only the
//! coordinator mutates it, so none of it needs locking.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    constants::{DEFAULT_POINTS_LIMIT, NUM_PLAYERS, WARHEAD_COUNT},
    entities::{Card, Deck, Hand, PassDirection, Seat, Username, next_seat},
    errors::{PlayError, WarheadError},
    rules::{self, TrickContext},
};

/// Game configuration settings
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GameSettings {
    /// The game ends after the round in which any seat reaches this many
    /// accumulated points.
    pub points_limit: u32,
    /// Every fourth round skips the warhead phase.
    pub hold_rounds: bool,
    /// How long to wait on a seat before pinging and re-prompting it.
    /// `None` waits indefinitely.
    pub turn_timeout: Option<Duration>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new(DEFAULT_POINTS_LIMIT, false, None)
    }
}

impl GameSettings {
    #[must_use]
    pub const fn new(points_limit: u32, hold_rounds: bool, turn_timeout: Option<Duration>) -> Self {
        Self {
            points_limit,
            hold_rounds,
            turn_timeout,
        }
    }
}

/// A seat's game-side record.
#[derive(Clone, Debug)]
pub struct Player {
    pub name: Username,
    pub hand: Hand,
    /// Score carried across rounds.
    pub accumulated_points: u32,
    /// Point cards taken this round.
    pub collected: Vec<Card>,
    /// Card played into the current trick.
    pub current_play: Option<Card>,
}

impl Player {
    pub fn new(name: Username) -> Self {
        Self {
            name,
            hand: Hand::new(),
            accumulated_points: 0,
            collected: Vec::new(),
            current_play: None,
        }
    }

    pub fn round_points(&self) -> u32 {
        self.collected.iter().map(|c| c.points()).sum()
    }
}

/// Outcome of a finished trick.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrickSummary {
    pub winner: Seat,
    pub plays: Vec<(Seat, Card)>,
    pub point_cards: Vec<Card>,
}

#[derive(Debug)]
pub struct GameState {
    /// Seats in turn order.
    pub players: Vec<Player>,
    /// Seat expected to play next. Unset until the first trick of a round
    /// has been opened with the two of clubs.
    pub turn_player: Option<Seat>,
    /// Seat currently winning the trick.
    pub leading_player: Option<Seat>,
    /// First card of the trick, which sets the led suit.
    pub base_play: Option<Card>,
    /// Sticky for the rest of the round once a point card is played.
    pub hearts_broken: bool,
    pub tricks_played: usize,
    pub rounds_played: usize,
    pub settings: GameSettings,
}

impl GameState {
    pub fn new(names: Vec<Username>, settings: GameSettings) -> Self {
        debug_assert_eq!(names.len(), NUM_PLAYERS);
        Self {
            players: names.into_iter().map(Player::new).collect(),
            turn_player: None,
            leading_player: None,
            base_play: None,
            hearts_broken: false,
            tricks_played: 0,
            rounds_played: 0,
            settings,
        }
    }

    pub fn reset_for_new_round(&mut self) {
        for player in &mut self.players {
            player.hand.clear();
            player.collected.clear();
            player.current_play = None;
        }
        self.turn_player = None;
        self.leading_player = None;
        self.base_play = None;
        self.hearts_broken = false;
        self.tricks_played = 0;
    }

    /// Clears the per-trick fields. The turn stays with whoever won the
    /// last trick.
    pub fn reset_for_new_trick(&mut self) {
        for player in &mut self.players {
            player.current_play = None;
        }
        self.leading_player = None;
        self.base_play = None;
    }

    /// Replace every hand with a round-robin deal of the deck.
    pub fn deal(&mut self, deck: Deck) {
        for (player, hand) in self.players.iter_mut().zip(deck.deal(NUM_PLAYERS)) {
            player.hand = hand;
        }
    }

    pub fn pass_direction(&self) -> PassDirection {
        PassDirection::for_round(self.rounds_played, self.settings.hold_rounds)
    }

    pub fn trick_context(&self) -> TrickContext {
        TrickContext {
            base_play: self.base_play,
            hearts_broken: self.hearts_broken,
            first_trick: self.tricks_played == 0,
        }
    }

    pub fn two_of_clubs_holder(&self) -> Option<Seat> {
        self.players
            .iter()
            .position(|p| p.hand.contains(Card::TWO_OF_CLUBS))
    }

    pub fn leading_card(&self) -> Option<Card> {
        self.leading_player
            .and_then(|seat| self.players.get(seat))
            .and_then(|p| p.current_play)
    }

    /// Plays of the current trick in seat order.
    pub fn trick_plays(&self) -> Vec<(Seat, Card)> {
        self.players
            .iter()
            .enumerate()
            .filter_map(|(seat, p)| p.current_play.map(|card| (seat, card)))
            .collect()
    }

    pub fn is_trick_complete(&self) -> bool {
        self.players.iter().all(|p| p.current_play.is_some())
    }

    /// Check whether `seat` may play `card` right now.
    ///
    /// # Errors
    ///
    /// Returns the rule the play breaks.
    pub fn is_valid_play(&self, seat: Seat, card: Card) -> Result<(), PlayError> {
        let player = self.players.get(seat).ok_or(PlayError::OutOfTurn)?;
        if self.is_trick_complete() {
            return Err(PlayError::TrickComplete);
        }
        if player.current_play.is_some() || self.turn_player.is_some_and(|turn| turn != seat) {
            return Err(PlayError::OutOfTurn);
        }
        rules::check_play(&player.hand, card, &self.trick_context())
    }

    /// Validate and record a play. Returns whether `seat` took the lead.
    ///
    /// # Errors
    ///
    /// Returns the rule the play breaks, leaving the state untouched.
    pub fn apply_play(&mut self, seat: Seat, card: Card) -> Result<bool, PlayError> {
        self.is_valid_play(seat, card)?;
        let player = &mut self.players[seat];
        player.hand.remove(card);
        player.current_play = Some(card);

        if card.is_point_card() {
            self.hearts_broken = true;
        }

        let took_lead = match self.leading_card() {
            None => {
                self.base_play = Some(card);
                true
            }
            Some(leading) => rules::overtakes(card, leading),
        };
        if took_lead {
            self.leading_player = Some(seat);
        }
        self.turn_player = Some(next_seat(seat));
        Ok(took_lead)
    }

    /// Hand the trick's point cards to the leading seat and give it the
    /// next lead. Returns `None` if nobody has played yet.
    pub fn finish_trick(&mut self) -> Option<TrickSummary> {
        let winner = self.leading_player?;
        let plays = self.trick_plays();
        let point_cards: Vec<Card> = plays
            .iter()
            .map(|(_, card)| *card)
            .filter(|card| card.is_point_card())
            .collect();
        self.players[winner]
            .collected
            .extend(point_cards.iter().copied());
        self.turn_player = Some(winner);
        self.tricks_played += 1;
        Some(TrickSummary {
            winner,
            plays,
            point_cards,
        })
    }

    /// Validate a warhead submission without touching the hand.
    ///
    /// # Errors
    ///
    /// Returns why the submission was rejected.
    pub fn validate_warheads(
        &self,
        seat: Seat,
        numbers: &[i64],
    ) -> Result<[Card; WARHEAD_COUNT], WarheadError> {
        let hand = self
            .players
            .get(seat)
            .map(|p| &p.hand)
            .ok_or(WarheadError::WrongCount {
                expected: WARHEAD_COUNT,
                actual: 0,
            })?;
        rules::check_warheads(hand, numbers)
    }

    /// Commit validated warheads from every seat at once. Returns the cards
    /// each seat received.
    pub fn exchange_warheads(
        &mut self,
        submissions: &[[Card; WARHEAD_COUNT]],
        direction: PassDirection,
    ) -> Vec<Vec<Card>> {
        let mut received = vec![Vec::with_capacity(WARHEAD_COUNT); self.players.len()];
        for (seat, cards) in submissions.iter().enumerate() {
            for card in cards {
                self.players[seat].hand.remove(*card);
            }
            received[direction.recipient(seat)].extend_from_slice(cards);
        }
        for (player, cards) in self.players.iter_mut().zip(&received) {
            for card in cards {
                player.hand.add(*card);
            }
        }
        received
    }

    /// Add each seat's round points to its total. Returns the round points.
    pub fn finish_round(&mut self) -> Vec<u32> {
        let round_points: Vec<u32> = self.players.iter().map(Player::round_points).collect();
        for (player, points) in self.players.iter_mut().zip(&round_points) {
            player.accumulated_points += points;
        }
        self.rounds_played += 1;
        round_points
    }

    pub fn totals(&self) -> Vec<u32> {
        self.players.iter().map(|p| p.accumulated_points).collect()
    }

    pub fn is_game_over(&self) -> bool {
        self.players
            .iter()
            .any(|p| p.accumulated_points >= self.settings.points_limit)
    }

    /// Seats tied for the lowest total.
    pub fn winners(&self) -> Vec<Seat> {
        let Some(best) = self.players.iter().map(|p| p.accumulated_points).min() else {
            return Vec::new();
        };
        self.players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.accumulated_points == best)
            .map(|(seat, _)| seat)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::game::entities::{Rank, Suit};

    pub(crate) fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit).unwrap()
    }

    pub(crate) fn state_with_hands(hands: [&[Card]; 4]) -> GameState {
        let names = (0..4).map(Username::for_seat).collect();
        let mut state = GameState::new(names, GameSettings::default());
        for (player, cards) in state.players.iter_mut().zip(hands) {
            player.hand = cards.iter().copied().collect();
        }
        state
    }

    #[test]
    fn led_clubs_trick_is_won_by_the_king() {
        let two_c = Card::TWO_OF_CLUBS;
        let nine_d = card(Rank::Nine, Suit::Diamond);
        let king_c = card(Rank::King, Suit::Club);
        let seven_c = card(Rank::Seven, Suit::Club);
        let mut state = state_with_hands([&[two_c], &[nine_d], &[king_c], &[seven_c]]);
        state.turn_player = Some(0);
        state.tricks_played = 1;

        assert!(state.apply_play(0, two_c).unwrap());
        assert!(!state.apply_play(1, nine_d).unwrap());
        assert!(state.apply_play(2, king_c).unwrap());
        assert!(!state.apply_play(3, seven_c).unwrap());

        assert_eq!(state.base_play, Some(two_c));
        assert_eq!(state.leading_player, Some(2));
        let summary = state.finish_trick().unwrap();
        assert_eq!(summary.winner, 2);
        assert!(summary.point_cards.is_empty());
        assert_eq!(state.turn_player, Some(2));
    }

    #[test]
    fn out_of_turn_play_is_rejected() {
        let a = card(Rank::Three, Suit::Club);
        let b = card(Rank::Four, Suit::Club);
        let mut state = state_with_hands([&[a], &[b], &[], &[]]);
        state.turn_player = Some(0);
        assert_eq!(state.is_valid_play(1, b), Err(PlayError::OutOfTurn));
    }

    #[test]
    fn rejected_play_leaves_state_untouched() {
        let heart = card(Rank::Ace, Suit::Heart);
        let club = card(Rank::Four, Suit::Club);
        let mut state = state_with_hands([&[heart, club], &[], &[], &[]]);
        state.turn_player = Some(0);
        state.tricks_played = 2;
        assert_eq!(state.apply_play(0, heart), Err(PlayError::HeartsNotBroken));
        assert_eq!(state.players[0].hand.len(), 2);
        assert_eq!(state.base_play, None);
    }

    #[test]
    fn point_card_breaks_hearts_and_is_collected() {
        let lead = card(Rank::Five, Suit::Diamond);
        let heart = card(Rank::Two, Suit::Heart);
        let high = card(Rank::Ace, Suit::Diamond);
        let low = card(Rank::Three, Suit::Diamond);
        let mut state = state_with_hands([&[lead], &[heart], &[high], &[Card::QUEEN_OF_SPADES, low]]);
        state.turn_player = Some(0);
        state.tricks_played = 3;

        state.apply_play(0, lead).unwrap();
        state.apply_play(1, heart).unwrap();
        assert!(state.hearts_broken);
        state.apply_play(2, high).unwrap();
        assert_eq!(
            state.apply_play(3, Card::QUEEN_OF_SPADES),
            Err(PlayError::MustFollowSuit(Suit::Diamond))
        );
        state.apply_play(3, low).unwrap();

        let summary = state.finish_trick().unwrap();
        assert_eq!(summary.winner, 2);
        assert_eq!(summary.point_cards, vec![heart]);
        assert_eq!(state.players[2].round_points(), 1);
    }

    #[test]
    fn warheads_exchange_to_recipients() {
        let deck = Deck::shuffled_with_seed(Default::default(), 11);
        let mut state = state_with_hands([&[], &[], &[], &[]]);
        state.deal(deck);

        let submissions: Vec<[Card; 3]> = state
            .players
            .iter()
            .map(|p| [p.hand.cards()[0], p.hand.cards()[1], p.hand.cards()[2]])
            .collect();
        let received = state.exchange_warheads(&submissions, PassDirection::Left);

        for seat in 0..4 {
            assert_eq!(state.players[seat].hand.len(), 13);
            let recipient = PassDirection::Left.recipient(seat);
            assert_eq!(received[recipient], submissions[seat].to_vec());
            for card in submissions[seat] {
                assert!(state.players[recipient].hand.contains(card));
                assert!(!state.players[seat].hand.contains(card));
            }
        }
    }

    #[test]
    fn invalid_warheads_do_not_mutate() {
        let cards = [Card::TWO_OF_CLUBS, Card::QUEEN_OF_SPADES];
        let state = state_with_hands([&cards, &[], &[], &[]]);
        let nums: Vec<i64> = cards.iter().map(|c| i64::from(c.number())).collect();
        assert!(state.validate_warheads(0, &nums).is_err());
        assert_eq!(state.players[0].hand.len(), 2);
    }

    #[test]
    fn round_tally_and_game_end() {
        let mut state = state_with_hands([&[], &[], &[], &[]]);
        state.settings.points_limit = 20;
        state.players[1].collected = vec![Card::QUEEN_OF_SPADES];
        state.players[2].collected = (0..13u8)
            .map(|r| card(Rank::from_value(r + 2).unwrap(), Suit::Heart))
            .collect();
        assert_eq!(state.finish_round(), vec![0, 13, 13, 0]);
        assert_eq!(state.rounds_played, 1);
        assert!(!state.is_game_over());
        assert_eq!(state.winners(), vec![0, 3]);

        state.reset_for_new_round();
        state.players[1].collected = vec![Card::QUEEN_OF_SPADES];
        state.finish_round();
        assert!(state.is_game_over());
        assert_eq!(state.totals(), vec![0, 26, 13, 0]);
    }
}
