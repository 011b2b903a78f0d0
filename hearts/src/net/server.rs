//! TCP lobby that seats players and hands full tables off to actors.

use anyhow::Error;
use std::{collections::BTreeSet, mem, net::SocketAddr, time::Duration};
use tokio::{
    net::{TcpListener, TcpStream},
    runtime,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    time::{MissedTickBehavior, interval, timeout},
};

use super::{
    connection::{PlayerConnection, WRITE_TIMEOUT},
    messages::{NetworkCode, Packet},
    roster::PlayerRoster,
    utils::write_frame,
};
use crate::{
    game::{
        constants::NUM_PLAYERS,
        entities::{Seat, Username},
        state::GameSettings,
    },
    table::{TableActor, TableId, TableOutcome},
};

/// Default interval between lobby polls.
pub const DEFAULT_LOBBY_POLL: Duration = Duration::from_millis(250);

/// Lobby polls between liveness pings.
const PING_EVERY_POLLS: u32 = 8;

/// Server configuration
#[derive(Clone, Debug)]
pub struct HeartsConfig {
    pub game: GameSettings,
    pub lobby_poll: Duration,
}

impl Default for HeartsConfig {
    fn default() -> Self {
        Self {
            game: GameSettings::default(),
            lobby_poll: DEFAULT_LOBBY_POLL,
        }
    }
}

/// Result of greeting a newly accepted peer off the lobby task.
enum Admission {
    Seated(PlayerConnection),
    Failed(Seat),
}

/// Players waiting for a table to fill.
struct Lobby {
    roster: PlayerRoster,
    /// Seats handed out whose greeting is still in flight.
    reserved: BTreeSet<Seat>,
    ready: BTreeSet<Seat>,
    polls: u32,
    next_table: TableId,
    settings: GameSettings,
    admissions: UnboundedSender<Admission>,
}

impl Lobby {
    fn new(settings: GameSettings) -> (Self, UnboundedReceiver<Admission>) {
        let (admissions, admitted) = mpsc::unbounded_channel();
        let lobby = Self {
            roster: PlayerRoster::new(),
            reserved: BTreeSet::new(),
            ready: BTreeSet::new(),
            polls: 0,
            next_table: 0,
            settings,
            admissions,
        };
        (lobby, admitted)
    }

    fn next_free_seat(&self) -> Option<Seat> {
        (0..NUM_PLAYERS).find(|seat| self.roster.get(*seat).is_none() && !self.reserved.contains(seat))
    }

    /// Reserve a seat for the peer and greet it in the background, so a slow
    /// peer never holds up the lobby.
    fn admit(&mut self, mut stream: TcpStream, addr: SocketAddr) {
        if let Err(error) = stream.set_nodelay(true) {
            log::debug!("couldn't set nodelay for {addr}: {error}");
        }
        let Some(seat) = self.next_free_seat() else {
            log::info!("denying {addr}, lobby is full");
            let denied = Packet::new(NetworkCode::ConnectionDenied).with_str("reason", "lobby is full");
            if let Ok(frame) = denied.to_frame() {
                tokio::spawn(async move {
                    if timeout(WRITE_TIMEOUT, write_frame(&mut stream, &frame)).await.is_err() {
                        log::debug!("{addr} never took its denial");
                    }
                });
            }
            return;
        };

        self.reserved.insert(seat);
        let admissions = self.admissions.clone();
        tokio::spawn(async move {
            let name = Username::for_seat(seat);
            let mut conn = PlayerConnection::new(seat, name.clone(), stream);
            let accepted = Packet::new(NetworkCode::ConnectionAccepted)
                .with_seat("player_num", seat)
                .with_str("name", &name);
            let admission = match conn.send(&accepted).await {
                Ok(()) => {
                    log::info!("{addr} seated as player {seat}");
                    Admission::Seated(conn)
                }
                Err(error) => {
                    log::info!("{addr} left before it was seated: {error}");
                    Admission::Failed(seat)
                }
            };
            // Only fails once the lobby itself is gone.
            let _ = admissions.send(admission);
        });
    }

    fn settle(&mut self, admission: Admission) {
        match admission {
            Admission::Seated(conn) => {
                self.reserved.remove(&conn.player_num());
                if let Err(conn) = self.roster.add(conn) {
                    log::error!("seat {} was taken twice", conn.player_num());
                }
            }
            Admission::Failed(seat) => {
                self.reserved.remove(&seat);
            }
        }
    }

    /// Drain every seat's queue, ping now and then, and drop dead seats.
    async fn poll(&mut self) {
        for conn in self.roster.connections_mut() {
            let seat = conn.player_num();
            while let Ok(Some(packet)) = conn.try_receive() {
                match packet.code {
                    NetworkCode::StartGame => {
                        if let Ok(name) = packet.str("name") {
                            conn.set_name(Username::new(name));
                        }
                        log::info!("player {seat} ({}) is ready", conn.name());
                        self.ready.insert(seat);
                    }
                    NetworkCode::Ping => {
                        let _ = conn.send(&Packet::ping()).await;
                    }
                    other => log::debug!("ignoring {other} from player {seat} in the lobby"),
                }
            }
        }

        self.polls = self.polls.wrapping_add(1);
        if self.polls % PING_EVERY_POLLS == 0
            && !self.roster.is_empty()
            && let Err(error) = self.roster.send_to_all(&Packet::ping()).await
        {
            log::debug!("lobby ping: {error}");
        }

        for seat in self.roster.sweep_disconnected() {
            log::info!("player {seat} left the lobby");
            self.ready.remove(&seat);
        }
    }

    fn is_ready(&self) -> bool {
        self.roster.is_full() && self.roster.seats().iter().all(|seat| self.ready.contains(seat))
    }

    fn start_table(&mut self) {
        let roster = mem::take(&mut self.roster);
        self.ready.clear();
        let id = self.next_table;
        self.next_table += 1;
        let actor = TableActor::new(id, roster, self.settings.clone());
        tokio::spawn(async move {
            match actor.run().await {
                TableOutcome::Finished { winners, .. } => {
                    log::info!("Table {id} finished, won by {winners:?}");
                }
                TableOutcome::Aborted(error) => log::info!("Table {id} aborted: {error}"),
            }
        });
    }
}

/// Accept players forever, starting a table whenever four are seated and
/// ready.
///
/// # Errors
///
/// Returns an error if the listener's address can't be read.
pub async fn serve(listener: TcpListener, config: HeartsConfig) -> Result<(), Error> {
    log::info!("Hearts lobby listening on {}", listener.local_addr()?);
    let (mut lobby, mut admitted) = Lobby::new(config.game);
    let mut ticker = interval(config.lobby_poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => lobby.admit(stream, addr),
                Err(error) => log::warn!("accept failed: {error}"),
            },
            Some(admission) = admitted.recv() => lobby.settle(admission),
            _ = ticker.tick() => {
                lobby.poll().await;
                if lobby.is_ready() {
                    lobby.start_table();
                }
            }
        }
    }
}

/// Run the server on its own runtime, blocking the calling thread.
///
/// # Errors
///
/// Returns an error if the runtime can't be built or the address can't be
/// bound.
pub fn run(addr: SocketAddr, config: HeartsConfig) -> Result<(), Error> {
    let runtime = runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async move {
        let listener = TcpListener::bind(addr).await?;
        serve(listener, config).await
    })
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpStream;

    use super::*;
    use crate::net::utils::read_frame;

    async fn recv(stream: &mut TcpStream) -> Packet {
        Packet::decode(&read_frame(stream).await.unwrap()).unwrap()
    }

    async fn spawn_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = HeartsConfig {
            lobby_poll: Duration::from_millis(10),
            ..HeartsConfig::default()
        };
        tokio::spawn(serve(listener, config));
        addr
    }

    #[tokio::test]
    async fn fifth_connection_is_denied() {
        let addr = spawn_server().await;
        let mut seated = Vec::new();
        for seat in 0..4 {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let accepted = recv(&mut stream).await;
            assert_eq!(accepted.code, NetworkCode::ConnectionAccepted);
            assert_eq!(accepted.seat("player_num").unwrap(), seat);
            assert_eq!(accepted.str("name").unwrap(), format!("player_{seat}"));
            seated.push(stream);
        }
        let mut extra = TcpStream::connect(addr).await.unwrap();
        let denied = recv(&mut extra).await;
        assert_eq!(denied.code, NetworkCode::ConnectionDenied);
        assert_eq!(denied.str("reason").unwrap(), "lobby is full");
    }

    #[tokio::test]
    async fn silent_denied_peers_do_not_hold_up_the_lobby() {
        let addr = spawn_server().await;
        let mut seated = Vec::new();
        for _ in 0..4 {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            recv(&mut stream).await;
            seated.push(stream);
        }
        // Denied peers that never read their denial.
        let mut silent = Vec::new();
        for _ in 0..8 {
            silent.push(TcpStream::connect(addr).await.unwrap());
        }

        let frame = Packet::ping().to_frame().unwrap();
        write_frame(&mut seated[1], &frame).await.unwrap();
        let pong = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                let packet = recv(&mut seated[1]).await;
                if packet.code == NetworkCode::Ping {
                    break packet;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(pong.code, NetworkCode::Ping);

        let mut late = TcpStream::connect(addr).await.unwrap();
        let denied = tokio::time::timeout(Duration::from_secs(1), recv(&mut late)).await.unwrap();
        assert_eq!(denied.code, NetworkCode::ConnectionDenied);
    }

    #[tokio::test]
    async fn reserved_seats_are_skipped_until_settled() {
        let (mut lobby, _admitted) = Lobby::new(GameSettings::default());
        lobby.reserved.insert(0);
        assert_eq!(lobby.next_free_seat(), Some(1));

        lobby.settle(Admission::Failed(0));
        assert!(lobby.reserved.is_empty());
        assert_eq!(lobby.next_free_seat(), Some(0));

        let (server_side, _client) = tokio::io::duplex(64);
        lobby.reserved.insert(0);
        let conn = PlayerConnection::new(0, Username::for_seat(0), server_side);
        lobby.settle(Admission::Seated(conn));
        assert!(lobby.reserved.is_empty());
        assert_eq!(lobby.roster.seats(), vec![0]);
        assert_eq!(lobby.next_free_seat(), Some(1));
    }

    #[tokio::test]
    async fn lobby_answers_pings_and_frees_seats() {
        let addr = spawn_server().await;
        let mut first = TcpStream::connect(addr).await.unwrap();
        recv(&mut first).await;
        let frame = Packet::ping().to_frame().unwrap();
        write_frame(&mut first, &frame).await.unwrap();
        assert_eq!(recv(&mut first).await.code, NetworkCode::Ping);
        drop(first);

        // Once the dead seat is swept, the next player gets seat 0 again.
        let mut reseated = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let packet = recv(&mut stream).await;
            if packet.code == NetworkCode::ConnectionAccepted && packet.seat("player_num").ok() == Some(0) {
                reseated = true;
                break;
            }
        }
        assert!(reseated);
    }
}
