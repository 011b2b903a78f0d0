//! Drives a single trick over the table's connections.

use super::{
    entities::{Card, DeckVariant, Seat, next_seat},
    state::{GameState, TrickSummary},
};
use crate::net::{
    errors::ConnectionError,
    messages::{NetworkCode, Packet},
    roster::PlayerRoster,
};

/// Where a trick currently is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TrickPhase {
    Start,
    /// First trick of a round; the two of clubs is played for its holder.
    AwaitTwoOfClubs,
    AwaitPlay(Seat),
    End,
}

pub struct TrickEngine<'a> {
    state: &'a mut GameState,
    roster: &'a mut PlayerRoster,
    phase: TrickPhase,
}

impl<'a> TrickEngine<'a> {
    pub fn new(state: &'a mut GameState, roster: &'a mut PlayerRoster) -> Self {
        Self {
            state,
            roster,
            phase: TrickPhase::Start,
        }
    }

    pub fn phase(&self) -> TrickPhase {
        self.phase
    }

    /// Run the trick to completion.
    ///
    /// # Errors
    ///
    /// Fails as soon as any seat's channel fails. The trick is abandoned
    /// with whatever plays were already applied.
    pub async fn run(mut self) -> Result<TrickSummary, ConnectionError> {
        loop {
            self.phase = match self.phase {
                TrickPhase::Start => self.start().await?,
                TrickPhase::AwaitTwoOfClubs => self.play_two_of_clubs().await?,
                TrickPhase::AwaitPlay(seat) => self.await_play(seat).await?,
                TrickPhase::End => {
                    debug_assert!(
                        self.state.is_trick_complete(),
                        "trick ended without every seat playing"
                    );
                    match self.state.finish_trick() {
                        Some(summary) => {
                            self.announce_end(&summary).await?;
                            return Ok(summary);
                        }
                        // Nobody played, so no hand changed. Start over.
                        None => {
                            log::error!("trick ended without any plays, restarting it");
                            TrickPhase::Start
                        }
                    }
                }
            };
        }
    }

    async fn start(&mut self) -> Result<TrickPhase, ConnectionError> {
        self.state.reset_for_new_trick();
        let holder = match self.state.turn_player {
            Some(_) => None,
            None => self.state.two_of_clubs_holder(),
        };
        let starting = self.state.turn_player.or(holder).unwrap_or_default();
        log::debug!("trick {} starts with player {starting}", self.state.tricks_played);
        let packet = Packet::new(NetworkCode::TrickStart)
            .with_int("trick", self.state.tricks_played as i64)
            .with_seat("starting_player", starting);
        self.roster.send_to_all(&packet).await?;
        if holder.is_some() {
            Ok(TrickPhase::AwaitTwoOfClubs)
        } else {
            self.state.turn_player = Some(starting);
            Ok(TrickPhase::AwaitPlay(starting))
        }
    }

    async fn play_two_of_clubs(&mut self) -> Result<TrickPhase, ConnectionError> {
        let Some(holder) = self.state.two_of_clubs_holder() else {
            self.state.turn_player = Some(0);
            return Ok(TrickPhase::AwaitPlay(0));
        };
        let packet = Packet::new(NetworkCode::PlayTwoOfClubs).with_seat("player_num", holder);
        self.roster.send_to_all(&packet).await?;
        match self.state.apply_play(holder, Card::TWO_OF_CLUBS) {
            Ok(_) => self.announce_play(holder, Card::TWO_OF_CLUBS).await,
            Err(error) => {
                log::error!("couldn't open with the two of clubs for player {holder}: {error}");
                self.state.turn_player = Some(holder);
                Ok(TrickPhase::AwaitPlay(holder))
            }
        }
    }

    async fn await_play(&mut self, seat: Seat) -> Result<TrickPhase, ConnectionError> {
        let make_play = Packet::new(NetworkCode::MakePlay);
        self.roster.send_to(seat, &make_play).await?;
        let waiting = Packet::new(NetworkCode::WaitForTurnPlayer).with_seat("player_num", seat);
        self.roster.send_to_others(seat, &waiting).await?;

        loop {
            let wait = self.state.settings.turn_timeout;
            let Some(packet) = self.roster.wait_receive(seat, wait).await? else {
                log::info!("player {seat} is taking a while, probing");
                self.roster.send_to(seat, &Packet::ping()).await?;
                self.roster.send_to(seat, &make_play).await?;
                continue;
            };
            match packet.code {
                NetworkCode::Play => {}
                NetworkCode::Ping => {
                    self.roster.send_to(seat, &Packet::ping()).await?;
                    continue;
                }
                other => {
                    log::debug!("ignoring {other} from player {seat} while awaiting a play");
                    continue;
                }
            }

            let number = match packet.int("play") {
                Ok(number) => number,
                Err(error) => {
                    log::warn!("bad play packet from player {seat}: {error}");
                    let invalid = Packet::new(NetworkCode::InvalidPlay).with_str("reason", error);
                    self.roster.send_to(seat, &invalid).await?;
                    self.roster.send_to(seat, &make_play).await?;
                    continue;
                }
            };
            let played = Card::from_number(number, DeckVariant::Standard)
                .map_err(|error| error.to_string())
                .and_then(|card| {
                    self.state
                        .apply_play(seat, card)
                        .map(|_| card)
                        .map_err(|error| error.to_string())
                });
            match played {
                Ok(card) => {
                    log::debug!("player {seat} played {card}");
                    return self.announce_play(seat, card).await;
                }
                Err(reason) => {
                    log::debug!("player {seat} made an invalid play: {reason}");
                    let invalid = Packet::new(NetworkCode::InvalidPlay)
                        .with_int("play", number)
                        .with_str("reason", reason);
                    self.roster.send_to(seat, &invalid).await?;
                    self.roster.send_to(seat, &make_play).await?;
                }
            }
        }
    }

    async fn announce_play(&mut self, seat: Seat, card: Card) -> Result<TrickPhase, ConnectionError> {
        let successful = Packet::new(NetworkCode::SuccessfulPlay).with_int("play", card.number());
        self.roster.send_to(seat, &successful).await?;
        let new_play = Packet::new(NetworkCode::WaitForNewPlay)
            .with_seat("player_num", seat)
            .with_int("play", card.number());
        self.roster.send_to_others(seat, &new_play).await?;
        let leading = self.state.leading_player.unwrap_or(seat);
        let leader = Packet::new(NetworkCode::WaitForLeadingPlayer).with_seat("player_num", leading);
        self.roster.send_to_all(&leader).await?;

        if self.state.is_trick_complete() {
            Ok(TrickPhase::End)
        } else {
            Ok(TrickPhase::AwaitPlay(next_seat(seat)))
        }
    }

    async fn announce_end(&mut self, summary: &TrickSummary) -> Result<(), ConnectionError> {
        log::debug!(
            "player {} takes trick {} with {} point cards",
            summary.winner,
            self.state.tricks_played,
            summary.point_cards.len()
        );
        let packet = Packet::new(NetworkCode::TrickEnd)
            .with_seat("winner", summary.winner)
            .with_cards("point_cards", &summary.point_cards);
        self.roster.send_to_all(&packet).await
    }
}
