//! The seated connections of a lobby or table.

use futures_util::stream::{FuturesUnordered, StreamExt};
use std::time::Duration;

use super::{connection::PlayerConnection, errors::ConnectionError, messages::Packet};
use crate::game::{
    constants::NUM_PLAYERS,
    entities::{Seat, Username},
};

/// Connections kept in seat order.
#[derive(Default)]
pub struct PlayerRoster {
    connections: Vec<PlayerConnection>,
}

impl PlayerRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat a connection. Hands it back if the roster is full or its seat
    /// is taken.
    pub fn add(&mut self, conn: PlayerConnection) -> Result<(), PlayerConnection> {
        if self.is_full() || self.get(conn.player_num()).is_some() {
            return Err(conn);
        }
        let at = self
            .connections
            .partition_point(|c| c.player_num() < conn.player_num());
        self.connections.insert(at, conn);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.connections.len() >= NUM_PLAYERS
    }

    /// Lowest seat nobody occupies.
    pub fn next_free_seat(&self) -> Option<Seat> {
        (0..NUM_PLAYERS).find(|seat| self.get(*seat).is_none())
    }

    pub fn names(&self) -> Vec<Username> {
        self.connections.iter().map(|c| c.name().clone()).collect()
    }

    pub fn seats(&self) -> Vec<Seat> {
        self.connections.iter().map(PlayerConnection::player_num).collect()
    }

    pub fn get(&self, seat: Seat) -> Option<&PlayerConnection> {
        self.connections.iter().find(|c| c.player_num() == seat)
    }

    pub fn get_mut(&mut self, seat: Seat) -> Option<&mut PlayerConnection> {
        self.connections.iter_mut().find(|c| c.player_num() == seat)
    }

    pub fn connections_mut(&mut self) -> impl Iterator<Item = &mut PlayerConnection> {
        self.connections.iter_mut()
    }

    pub async fn send_to(&mut self, seat: Seat, packet: &Packet) -> Result<(), ConnectionError> {
        match self.get_mut(seat) {
            Some(conn) => conn.send(packet).await,
            None => Err(ConnectionError::Disconnected(seat)),
        }
    }

    pub async fn send_to_all(&mut self, packet: &Packet) -> Result<(), ConnectionError> {
        self.multicast(packet, |_| true).await
    }

    pub async fn send_to_others(
        &mut self,
        except: Seat,
        packet: &Packet,
    ) -> Result<(), ConnectionError> {
        self.multicast(packet, |seat| seat != except).await
    }

    /// Encode once and write to every selected seat concurrently. Every
    /// seat is attempted even after one fails.
    async fn multicast(
        &mut self,
        packet: &Packet,
        include: impl Fn(Seat) -> bool,
    ) -> Result<(), ConnectionError> {
        let frame = match packet.to_frame() {
            Ok(frame) => frame,
            Err(error) => {
                log::error!("can't encode {packet}: {error}");
                return Ok(());
            }
        };
        log::debug!("multicast <- {packet}");
        let frame = &frame;
        let failed: Vec<Seat> = self
            .connections
            .iter_mut()
            .filter(|c| include(c.player_num()))
            .map(|conn| async move { (conn.player_num(), conn.send_frame(frame).await) })
            .collect::<FuturesUnordered<_>>()
            .filter_map(|(seat, result)| async move { result.err().map(|_| seat) })
            .collect()
            .await;
        ConnectionError::from_seats(failed).map_or(Ok(()), Err)
    }

    /// Send each seat its own packet.
    pub async fn send_each(
        &mut self,
        packet_for: impl Fn(Seat) -> Packet,
    ) -> Result<(), ConnectionError> {
        let mut failed = Vec::new();
        for conn in &mut self.connections {
            let seat = conn.player_num();
            if conn.send(&packet_for(seat)).await.is_err() {
                failed.push(seat);
            }
        }
        ConnectionError::from_seats(failed).map_or(Ok(()), Err)
    }

    /// Wait on one seat's queue. Any other seat failing meanwhile ends the
    /// wait too, reported together with every seat already gone.
    pub async fn wait_receive(
        &mut self,
        seat: Seat,
        wait: Option<Duration>,
    ) -> Result<Option<Packet>, ConnectionError> {
        let gone = {
            let mut awaited = None;
            let mut others = FuturesUnordered::new();
            for conn in &mut self.connections {
                if conn.player_num() == seat {
                    awaited = Some(conn);
                } else {
                    others.push(async move {
                        conn.closed().await;
                        conn.player_num()
                    });
                }
            }
            let Some(conn) = awaited else {
                return Err(ConnectionError::Disconnected(seat));
            };
            tokio::select! {
                received = conn.wait_receive(wait) => return received,
                Some(gone) = others.next() => gone,
            }
        };
        log::info!("player {gone} dropped while waiting on player {seat}");
        Err(self.disconnect_error(gone))
    }

    /// Drop every connection known to have failed. Returns their seats.
    pub fn sweep_disconnected(&mut self) -> Vec<Seat> {
        let mut swept = Vec::new();
        self.connections.retain_mut(|conn| {
            if conn.is_disconnected() {
                conn.close();
                swept.push(conn.player_num());
                false
            } else {
                true
            }
        });
        swept
    }

    pub fn disconnected_seats(&self) -> Vec<Seat> {
        self.connections
            .iter()
            .filter(|c| c.is_disconnected())
            .map(PlayerConnection::player_num)
            .collect()
    }

    /// The error for `seat` failing, folded together with every other seat
    /// already known to be gone.
    pub fn disconnect_error(&self, seat: Seat) -> ConnectionError {
        let mut seats = self.disconnected_seats();
        seats.push(seat);
        ConnectionError::from_seats(seats).unwrap_or(ConnectionError::Disconnected(seat))
    }

    pub fn close_all(&mut self) {
        for conn in &mut self.connections {
            conn.close();
        }
    }
}
