//! Bot player state, kept in sync with the table from server packets.

use super::decision::BotDecisionMaker;
use crate::{
    game::{
        entities::{Card, DeckVariant, Hand, Seat},
        rules::TrickContext,
    },
    net::messages::{NetworkCode, Packet},
};

/// Bot statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotStats {
    pub rounds_played: u32,
    pub tricks_taken: u32,
    /// Total points as last announced by the server
    pub total_points: u32,
}

fn decode_cards(numbers: &[i64]) -> Vec<Card> {
    numbers
        .iter()
        .filter_map(|n| Card::from_number(*n, DeckVariant::Standard).ok())
        .collect()
}

/// A client-side player that follows the server's packets and answers
/// prompts with legal moves.
#[derive(Debug)]
pub struct BotPlayer {
    player_num: Option<Seat>,
    hand: Hand,
    ctx: TrickContext,
    decision: BotDecisionMaker,
    stats: BotStats,
    finished: bool,
}

impl BotPlayer {
    pub fn new() -> Self {
        Self::with_decision(BotDecisionMaker::new())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_decision(BotDecisionMaker::with_seed(seed))
    }

    fn with_decision(decision: BotDecisionMaker) -> Self {
        Self {
            player_num: None,
            hand: Hand::new(),
            ctx: TrickContext::default(),
            decision,
            stats: BotStats::default(),
            finished: false,
        }
    }

    pub fn player_num(&self) -> Option<Seat> {
        self.player_num
    }

    pub fn hand(&self) -> &Hand {
        &self.hand
    }

    pub fn stats(&self) -> &BotStats {
        &self.stats
    }

    /// Whether the game is over for this bot, either finished or aborted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn record_play(&mut self, card: Card) {
        if self.ctx.base_play.is_none() {
            self.ctx.base_play = Some(card);
        }
        if card.is_point_card() {
            self.ctx.hearts_broken = true;
        }
    }

    fn warheads(&mut self, retry: bool) -> Option<Packet> {
        let cards = if retry {
            self.decision.random_warheads(&self.hand)
        } else {
            self.decision.choose_warheads(&self.hand)
        };
        match cards {
            Some(cards) => Some(Packet::warheads(&cards)),
            None => {
                log::warn!("bot can't pass from a hand of {}", self.hand.len());
                None
            }
        }
    }

    /// Update from one server packet. Returns the reply, if the packet
    /// asks for one.
    pub fn handle(&mut self, packet: &Packet) -> Option<Packet> {
        match packet.code {
            NetworkCode::ConnectionAccepted => {
                self.player_num = packet.seat("player_num").ok();
            }
            NetworkCode::RoundStart => {
                self.ctx = TrickContext::default();
            }
            NetworkCode::WaitForHand => {
                if let Ok(numbers) = packet.int_list("hand") {
                    self.hand = decode_cards(numbers).into_iter().collect();
                }
            }
            NetworkCode::SendWarheads => return self.warheads(false),
            NetworkCode::InvalidWarheads => {
                log::warn!("bot warheads refused: {}", packet.str("reason").unwrap_or_default());
                return self.warheads(true);
            }
            NetworkCode::TrickStart => {
                self.ctx.base_play = None;
                self.ctx.first_trick = packet.int("trick").is_ok_and(|trick| trick == 0);
            }
            NetworkCode::MakePlay => {
                let card = self.decision.choose_play(&self.hand, &self.ctx);
                if card.is_none() {
                    log::warn!("bot has no legal play from {}", self.hand);
                }
                return card.map(Packet::play);
            }
            NetworkCode::InvalidPlay => {
                log::warn!("bot play refused: {}", packet.str("reason").unwrap_or_default());
            }
            NetworkCode::SuccessfulPlay => {
                if let Some(card) = packet
                    .int("play")
                    .ok()
                    .and_then(|n| Card::from_number(n, DeckVariant::Standard).ok())
                {
                    self.hand.remove(card);
                    self.record_play(card);
                }
            }
            NetworkCode::WaitForNewPlay => {
                if let Some(card) = packet
                    .int("play")
                    .ok()
                    .and_then(|n| Card::from_number(n, DeckVariant::Standard).ok())
                {
                    self.record_play(card);
                }
            }
            NetworkCode::TrickEnd => {
                if self.player_num.is_some() && packet.seat("winner").ok() == self.player_num {
                    self.stats.tricks_taken += 1;
                }
            }
            NetworkCode::RoundEnd => {
                self.stats.rounds_played += 1;
                if let (Some(seat), Ok(totals)) = (self.player_num, packet.int_list("total_points"))
                    && let Some(total) = totals.get(seat)
                {
                    self.stats.total_points = u32::try_from(*total).unwrap_or_default();
                }
            }
            NetworkCode::GameEnd | NetworkCode::PlayerDisconnected => {
                self.finished = true;
            }
            _ => {}
        }
        None
    }
}

impl Default for BotPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Rank, Suit};

    fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit).unwrap()
    }

    fn hand_packet(cards: &[Card]) -> Packet {
        Packet::new(NetworkCode::WaitForHand).with_cards("hand", cards)
    }

    #[test]
    fn follows_suit_led_by_another_seat() {
        let mut bot = BotPlayer::with_seed(1);
        let diamond = card(Rank::Four, Suit::Diamond);
        bot.handle(&hand_packet(&[diamond, card(Rank::Ace, Suit::Spade)]));
        bot.handle(&Packet::new(NetworkCode::TrickStart).with_int("trick", 4));
        bot.handle(
            &Packet::new(NetworkCode::WaitForNewPlay)
                .with_seat("player_num", 0)
                .with_int("play", card(Rank::Nine, Suit::Diamond).number()),
        );
        let reply = bot.handle(&Packet::new(NetworkCode::MakePlay)).unwrap();
        assert_eq!(reply, Packet::play(diamond));
    }

    #[test]
    fn opening_lead_is_two_of_clubs() {
        let mut bot = BotPlayer::with_seed(2);
        bot.handle(&hand_packet(&[Card::TWO_OF_CLUBS, card(Rank::Ace, Suit::Club)]));
        bot.handle(&Packet::new(NetworkCode::TrickStart).with_int("trick", 0));
        let reply = bot.handle(&Packet::new(NetworkCode::MakePlay)).unwrap();
        assert_eq!(reply, Packet::play(Card::TWO_OF_CLUBS));

        bot.handle(&Packet::new(NetworkCode::SuccessfulPlay).with_int("play", Card::TWO_OF_CLUBS.number()));
        assert_eq!(bot.hand().len(), 1);
    }

    #[test]
    fn answers_warhead_prompts() {
        let mut bot = BotPlayer::with_seed(3);
        let cards = [
            Card::QUEEN_OF_SPADES,
            card(Rank::Ace, Suit::Heart),
            card(Rank::King, Suit::Heart),
            card(Rank::Two, Suit::Diamond),
        ];
        bot.handle(&hand_packet(&cards));
        let reply = bot
            .handle(&Packet::new(NetworkCode::SendWarheads).with_seat("recipient", 1))
            .unwrap();
        assert_eq!(reply, Packet::warheads(&cards[..3]));

        let retry = bot
            .handle(&Packet::new(NetworkCode::InvalidWarheads).with_str("reason", "nope"))
            .unwrap();
        assert_eq!(retry.int_list("warheads").unwrap().len(), 3);
    }

    #[test]
    fn game_end_finishes_and_stats_track() {
        let mut bot = BotPlayer::with_seed(4);
        bot.handle(
            &Packet::new(NetworkCode::ConnectionAccepted)
                .with_seat("player_num", 2)
                .with_str("name", "bot"),
        );
        bot.handle(&Packet::new(NetworkCode::TrickEnd).with_seat("winner", 2));
        bot.handle(
            &Packet::new(NetworkCode::RoundEnd)
                .with_ints("round_points", vec![0, 0, 26, 0])
                .with_ints("total_points", vec![0, 0, 26, 0]),
        );
        assert!(!bot.is_finished());
        bot.handle(&Packet::new(NetworkCode::GameEnd));
        assert!(bot.is_finished());
        assert_eq!(
            bot.stats(),
            &BotStats {
                rounds_played: 1,
                tricks_taken: 1,
                total_points: 26,
            }
        );
    }
}
