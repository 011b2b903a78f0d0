//! One deal of thirteen tricks, warhead exchange included.

use futures_util::stream::{FuturesUnordered, StreamExt};
use std::time::Duration;

use super::{
    constants::{NUM_PLAYERS, TRICKS_PER_ROUND, WARHEAD_COUNT},
    entities::{Card, Deck, DeckVariant, Hand, PassDirection, Seat},
    rules,
    state::GameState,
    trick::TrickEngine,
};
use crate::net::{
    connection::PlayerConnection,
    errors::ConnectionError,
    messages::{NetworkCode, Packet},
    roster::PlayerRoster,
};

/// Scores at the end of a round.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoundSummary {
    /// 1-based round number.
    pub round: usize,
    pub round_points: Vec<u32>,
    pub total_points: Vec<u32>,
}

pub struct RoundEngine<'a> {
    state: &'a mut GameState,
    roster: &'a mut PlayerRoster,
}

fn send_warheads_packet(recipient: Seat) -> Packet {
    Packet::new(NetworkCode::SendWarheads).with_seat("recipient", recipient)
}

/// Wait until `conn` submits a valid set of warheads from `hand`.
async fn await_warheads(
    conn: &mut PlayerConnection,
    hand: &Hand,
    recipient: Seat,
    wait: Option<Duration>,
) -> Result<(Seat, [Card; WARHEAD_COUNT]), ConnectionError> {
    let seat = conn.player_num();
    loop {
        let Some(packet) = conn.wait_receive(wait).await? else {
            log::info!("player {seat} is taking a while to pass, probing");
            conn.send(&Packet::ping()).await?;
            conn.send(&send_warheads_packet(recipient)).await?;
            continue;
        };
        match packet.code {
            NetworkCode::Warheads => {}
            NetworkCode::Ping => {
                conn.send(&Packet::ping()).await?;
                continue;
            }
            other => {
                log::debug!("ignoring {other} from player {seat} while awaiting warheads");
                continue;
            }
        }

        let checked = packet
            .int_list("warheads")
            .map_err(|error| error.to_string())
            .and_then(|numbers| rules::check_warheads(hand, numbers).map_err(|error| error.to_string()));
        match checked {
            Ok(cards) => {
                log::debug!("player {seat} passes {} {} {}", cards[0], cards[1], cards[2]);
                let accepted = Packet::new(NetworkCode::SuccessfulWarheads).with_cards("warheads", &cards);
                conn.send(&accepted).await?;
                return Ok((seat, cards));
            }
            Err(reason) => {
                log::debug!("player {seat} sent invalid warheads: {reason}");
                let rejected = Packet::new(NetworkCode::InvalidWarheads).with_str("reason", reason);
                conn.send(&rejected).await?;
            }
        }
    }
}

impl<'a> RoundEngine<'a> {
    pub fn new(state: &'a mut GameState, roster: &'a mut PlayerRoster) -> Self {
        Self { state, roster }
    }

    /// Play a round with a freshly shuffled deck.
    pub async fn run(self) -> Result<RoundSummary, ConnectionError> {
        self.run_with_deck(Deck::shuffled(DeckVariant::Standard)).await
    }

    /// Play a round dealing from `deck` as given.
    ///
    /// # Errors
    ///
    /// Fails as soon as any seat's channel fails. Scores are only
    /// committed once the last trick is over.
    pub async fn run_with_deck(mut self, deck: Deck) -> Result<RoundSummary, ConnectionError> {
        let round = self.state.rounds_played + 1;
        self.state.reset_for_new_round();
        self.state.deal(deck);
        let direction = self.state.pass_direction();
        log::info!("round {round} starts, passing {direction}");

        let start = Packet::new(NetworkCode::RoundStart)
            .with_int("round", round as i64)
            .with_str("pass_direction", direction);
        self.roster.send_to_all(&start).await?;
        self.send_hands(None).await?;

        if direction.requires_passing() {
            self.roster
                .send_each(|seat| send_warheads_packet(direction.recipient(seat)))
                .await?;
            let submissions = self.collect_warheads(direction).await?;
            let received = self.state.exchange_warheads(&submissions, direction);
            self.send_hands(Some(received.as_slice())).await?;
        }

        for _ in 0..TRICKS_PER_ROUND {
            TrickEngine::new(&mut *self.state, &mut *self.roster).run().await?;
        }

        let round_points = self.state.finish_round();
        let total_points = self.state.totals();
        log::info!("round {round} over, points {round_points:?}, totals {total_points:?}");
        let end = Packet::new(NetworkCode::RoundEnd)
            .with_ints("round_points", round_points.iter().map(|p| i64::from(*p)).collect())
            .with_ints("total_points", total_points.iter().map(|p| i64::from(*p)).collect());
        self.roster.send_to_all(&end).await?;

        Ok(RoundSummary {
            round,
            round_points,
            total_points,
        })
    }

    async fn send_hands(&mut self, received: Option<&[Vec<Card>]>) -> Result<(), ConnectionError> {
        let players = &self.state.players;
        self.roster
            .send_each(|seat| {
                let hand = players.get(seat).map(|p| p.hand.numbers()).unwrap_or_default();
                let packet = Packet::new(NetworkCode::WaitForHand).with_ints("hand", hand);
                match received.and_then(|r| r.get(seat)) {
                    Some(cards) => packet.with_cards("received", cards),
                    None => packet,
                }
            })
            .await
    }

    /// Await every seat's warheads at once. Returns them indexed by seat.
    async fn collect_warheads(
        &mut self,
        direction: PassDirection,
    ) -> Result<Vec<[Card; WARHEAD_COUNT]>, ConnectionError> {
        let wait = self.state.settings.turn_timeout;
        let players = &self.state.players;
        let mut pending: FuturesUnordered<_> = self
            .roster
            .connections_mut()
            .map(|conn| {
                let seat = conn.player_num();
                await_warheads(conn, &players[seat].hand, direction.recipient(seat), wait)
            })
            .collect();

        let mut submissions = vec![None; NUM_PLAYERS];
        let mut failure = None;
        while let Some(result) = pending.next().await {
            match result {
                Ok((seat, cards)) => submissions[seat] = Some(cards),
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }
        // Cancels the reads still pending on the other seats.
        drop(pending);

        if let Some(error) = failure {
            return Err(match ConnectionError::from_seats(self.roster.disconnected_seats()) {
                Some(known) => error.merge(known),
                None => error,
            });
        }
        let mut missing = Vec::new();
        let mut collected = Vec::with_capacity(NUM_PLAYERS);
        for (seat, submission) in submissions.into_iter().enumerate() {
            match submission {
                Some(cards) => collected.push(cards),
                None => missing.push(seat),
            }
        }
        match ConnectionError::from_seats(missing) {
            Some(error) => Err(error),
            None => Ok(collected),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{io::DuplexStream, task::JoinHandle};

    use super::*;
    use crate::{
        bot::BotPlayer,
        game::state::tests::state_with_hands,
        net::{
            roster::tests::full_roster,
            utils::{read_frame, write_frame},
        },
    };

    /// Play as a bot until ROUND_END. Resolves with every packet seen.
    fn bot_client(mut client: DuplexStream, seed: u64) -> JoinHandle<Vec<Packet>> {
        tokio::spawn(async move {
            let mut bot = BotPlayer::with_seed(seed);
            let mut seen = Vec::new();
            loop {
                let packet = Packet::decode(&read_frame(&mut client).await.unwrap()).unwrap();
                if let Some(reply) = bot.handle(&packet) {
                    write_frame(&mut client, &reply.to_frame().unwrap()).await.unwrap();
                }
                let done = packet.code == NetworkCode::RoundEnd;
                seen.push(packet);
                if done {
                    return seen;
                }
            }
        })
    }

    #[tokio::test]
    async fn full_round_with_passing() {
        let mut state = state_with_hands([&[], &[], &[], &[]]);
        let (mut roster, clients) = full_roster();
        let handles: Vec<_> = clients
            .into_iter()
            .enumerate()
            .map(|(seat, client)| bot_client(client, seat as u64))
            .collect();

        let deck = Deck::shuffled_with_seed(DeckVariant::Standard, 42);
        let summary = RoundEngine::new(&mut state, &mut roster)
            .run_with_deck(deck)
            .await
            .unwrap();

        assert_eq!(summary.round, 1);
        assert_eq!(state.tricks_played, TRICKS_PER_ROUND);
        assert!(state.players.iter().all(|p| p.hand.is_empty()));
        // Hearts are worth 13 and the queen 13, whoever took them.
        let points: u32 = summary.round_points.iter().sum();
        assert_eq!(points, 26);
        assert_eq!(summary.total_points, summary.round_points);

        for (seat, handle) in handles.into_iter().enumerate() {
            let seen = handle.await.unwrap();
            let hands: Vec<&Packet> = seen
                .iter()
                .filter(|p| p.code == NetworkCode::WaitForHand)
                .collect();
            assert_eq!(hands.len(), 2);
            assert_eq!(hands[0].int_list("hand").unwrap().len(), 13);
            assert_eq!(hands[1].int_list("received").unwrap().len(), WARHEAD_COUNT);
            let tricks = seen
                .iter()
                .filter(|p| p.code == NetworkCode::TrickEnd)
                .count();
            assert_eq!(tricks, TRICKS_PER_ROUND, "seat {seat}");
        }
    }

    #[tokio::test]
    async fn invalid_warheads_are_reprompted() {
        let mut state = state_with_hands([&[], &[], &[], &[]]);
        state.deal(Deck::shuffled_with_seed(DeckVariant::Standard, 7));
        let (mut roster, mut clients) = full_roster();

        let hands: Vec<Vec<Card>> = state.players.iter().map(|p| p.hand.cards().to_vec()).collect();
        let foreign = hands[1][0];
        let writers: Vec<_> = clients
            .iter_mut()
            .enumerate()
            .map(|(seat, client)| {
                let mut frames = Vec::new();
                if seat == 0 {
                    let bad = [hands[0][0], hands[0][1], foreign];
                    frames.push(Packet::warheads(&bad).to_frame().unwrap());
                }
                frames.push(Packet::warheads(&hands[seat][..3]).to_frame().unwrap());
                (client, frames)
            })
            .collect();
        for (client, frames) in writers {
            for frame in frames {
                write_frame(&mut *client, &frame).await.unwrap();
            }
        }

        let mut engine = RoundEngine::new(&mut state, &mut roster);
        let submissions = engine.collect_warheads(PassDirection::Left).await.unwrap();
        for (seat, cards) in submissions.iter().enumerate() {
            assert_eq!(cards.to_vec(), hands[seat][..3].to_vec());
        }

        let first = Packet::decode(&read_frame(&mut clients[0]).await.unwrap()).unwrap();
        assert_eq!(first.code, NetworkCode::InvalidWarheads);
        let second = Packet::decode(&read_frame(&mut clients[0]).await.unwrap()).unwrap();
        assert_eq!(second.code, NetworkCode::SuccessfulWarheads);
        // Nothing moved until every seat had passed.
        assert_eq!(state.players[0].hand.len(), 13);
    }

    #[tokio::test]
    async fn disconnect_during_passing_aborts_the_round() {
        let mut state = state_with_hands([&[], &[], &[], &[]]);
        let (mut roster, mut clients) = full_roster();
        let dropped = clients.remove(3);
        let readers: Vec<_> = clients
            .into_iter()
            .map(|mut client| {
                tokio::spawn(async move { while read_frame(&mut client).await.is_ok() {} })
            })
            .collect();

        // Seat 3 vanishes after being dealt in.
        let deck = Deck::shuffled_with_seed(DeckVariant::Standard, 3);
        let mut engine = RoundEngine::new(&mut state, &mut roster);
        engine.state.deal(deck);
        drop(dropped);
        let result = engine.collect_warheads(PassDirection::Across).await;
        assert_eq!(result, Err(ConnectionError::Disconnected(3)));

        roster.close_all();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
