//! Table actor running one game from first deal to game end.

use crate::{
    game::{
        entities::{Deck, DeckVariant, Seat},
        round::RoundEngine,
        state::{GameSettings, GameState},
    },
    net::{
        errors::ConnectionError,
        messages::{NetworkCode, Packet},
        roster::PlayerRoster,
    },
};

/// Table identifier
pub type TableId = u64;

/// How a table's game ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TableOutcome {
    /// Someone reached the points limit.
    Finished {
        totals: Vec<u32>,
        winners: Vec<Seat>,
    },
    /// A seat's channel failed and the game was abandoned.
    Aborted(ConnectionError),
}

/// Table actor owning a full roster and the game state. It is the only
/// task that touches either.
pub struct TableActor {
    id: TableId,
    state: GameState,
    roster: PlayerRoster,
    /// Seeds each round's deal when set.
    deal_seed: Option<u64>,
}

impl TableActor {
    pub fn new(id: TableId, roster: PlayerRoster, settings: GameSettings) -> Self {
        let state = GameState::new(roster.names(), settings);
        Self {
            id,
            state,
            roster,
            deal_seed: None,
        }
    }

    /// Deal every round from a seeded shuffle.
    #[must_use]
    pub fn with_deal_seed(mut self, seed: u64) -> Self {
        self.deal_seed = Some(seed);
        self
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    fn next_deck(&self) -> Deck {
        match self.deal_seed {
            Some(seed) => Deck::shuffled_with_seed(
                DeckVariant::Standard,
                seed.wrapping_add(self.state.rounds_played as u64),
            ),
            None => Deck::shuffled(DeckVariant::Standard),
        }
    }

    /// Play rounds until the game ends or a seat drops.
    pub async fn run(mut self) -> TableOutcome {
        log::info!(
            "Table {} starting with {}",
            self.id,
            self.roster
                .names()
                .iter()
                .map(|name| name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let outcome = match self.play().await {
            Ok(()) => self.finish().await,
            Err(error) => self.abort(error).await,
        };
        self.roster.close_all();
        log::info!("Table {} closed: {outcome:?}", self.id);
        outcome
    }

    async fn play(&mut self) -> Result<(), ConnectionError> {
        while !self.state.is_game_over() {
            let deck = self.next_deck();
            let summary = RoundEngine::new(&mut self.state, &mut self.roster)
                .run_with_deck(deck)
                .await?;
            log::debug!("Table {} round {} complete", self.id, summary.round);
        }
        Ok(())
    }

    async fn finish(&mut self) -> TableOutcome {
        let totals = self.state.totals();
        let winners = self.state.winners();
        let packet = Packet::new(NetworkCode::GameEnd)
            .with_ints("total_points", totals.iter().map(|p| i64::from(*p)).collect())
            .with_ints("winners", winners.iter().map(|seat| *seat as i64).collect());
        if let Err(error) = self.roster.send_to_all(&packet).await {
            log::warn!("Table {}: {error} before the final scores went out", self.id);
        }
        TableOutcome::Finished { totals, winners }
    }

    /// Tell the seats still connected who dropped.
    async fn abort(&mut self, error: ConnectionError) -> TableOutcome {
        let error = match ConnectionError::from_seats(self.roster.disconnected_seats()) {
            Some(known) => error.merge(known),
            None => error,
        };
        log::warn!("Table {}: {error}, ending game", self.id);
        let gone = error.seats();
        let packet = Packet::new(NetworkCode::PlayerDisconnected)
            .with_ints("players", gone.iter().map(|seat| *seat as i64).collect());
        for seat in self.roster.seats() {
            if !gone.contains(&seat) {
                let _ = self.roster.send_to(seat, &packet).await;
            }
        }
        TableOutcome::Aborted(error)
    }
}
