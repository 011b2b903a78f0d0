//! One player's duplex channel.
//!
//! Each connection owns the write half of its stream and a reader task
//! that decodes frames into an unbounded queue. The coordinator is the
//! only consumer of that queue, so a packet is never seen twice.

use std::time::Duration;

use tokio::{
    io::{AsyncRead, AsyncWrite, ReadHalf},
    sync::{
        mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError},
        watch,
    },
    task::JoinHandle,
    time::timeout,
};

use super::{
    errors::ConnectionError,
    messages::Packet,
    utils::{read_frame, write_frame},
};
use crate::game::entities::{Seat, Username};

/// How long a single frame write may take before the peer is considered
/// gone.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// An item in a connection's receive queue.
#[derive(Debug)]
pub enum Inbound {
    Data(Packet),
    /// The reader hit a failure it can't recover from. Always the last
    /// item the queue yields.
    ChannelClosed,
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

pub struct PlayerConnection {
    player_num: Seat,
    name: Username,
    writer: Option<BoxedWriter>,
    inbox: UnboundedReceiver<Inbound>,
    reader: JoinHandle<()>,
    /// Flips to `true` when the reader task exits.
    closed: watch::Receiver<bool>,
    disconnected: bool,
}

async fn read_loop<S: AsyncRead>(
    mut reader: ReadHalf<S>,
    queue: UnboundedSender<Inbound>,
    player_num: Seat,
) {
    loop {
        let payload = match read_frame(&mut reader).await {
            Ok(payload) => payload,
            Err(error) => {
                log::debug!("player {player_num} channel closed: {error}");
                let _ = queue.send(Inbound::ChannelClosed);
                return;
            }
        };
        match Packet::decode(&payload) {
            Ok(packet) => {
                log::debug!("player {player_num} -> {packet}");
                if queue.send(Inbound::Data(packet)).is_err() {
                    return;
                }
            }
            Err(error) => log::warn!("dropping malformed packet from player {player_num}: {error}"),
        }
    }
}

impl PlayerConnection {
    /// Split `stream` and start its reader task. Must be called within a
    /// tokio runtime.
    pub fn new<S>(player_num: Seat, name: Username, stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (queue, inbox) = mpsc::unbounded_channel();
        let (closed_tx, closed) = watch::channel(false);
        let reader = tokio::spawn(async move {
            read_loop(read_half, queue, player_num).await;
            let _ = closed_tx.send(true);
        });
        Self {
            player_num,
            name,
            writer: Some(Box::new(write_half)),
            inbox,
            reader,
            closed,
            disconnected: false,
        }
    }

    pub fn player_num(&self) -> Seat {
        self.player_num
    }

    pub fn name(&self) -> &Username {
        &self.name
    }

    pub fn set_name(&mut self, name: Username) {
        self.name = name;
    }

    fn disconnect_error(&self) -> ConnectionError {
        ConnectionError::Disconnected(self.player_num)
    }

    /// Encode and send one packet. A packet that can't be encoded is logged
    /// and skipped; it says nothing about the channel.
    pub async fn send(&mut self, packet: &Packet) -> Result<(), ConnectionError> {
        let frame = match packet.to_frame() {
            Ok(frame) => frame,
            Err(error) => {
                log::error!("can't encode {packet} for player {}: {error}", self.player_num);
                return Ok(());
            }
        };
        log::debug!("player {} <- {packet}", self.player_num);
        self.send_frame(&frame).await
    }

    /// Send an already encoded frame. Any failure closes the connection,
    /// and so does sending on a channel whose reader already hit the end.
    pub async fn send_frame(&mut self, frame: &[u8]) -> Result<(), ConnectionError> {
        if self.is_disconnected() {
            self.close();
            return Err(self.disconnect_error());
        }
        let Some(writer) = self.writer.as_mut() else {
            return Err(self.disconnect_error());
        };
        let result = timeout(WRITE_TIMEOUT, write_frame(writer, frame)).await;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => {
                log::warn!("write to player {} failed: {error}", self.player_num);
                self.close();
                Err(self.disconnect_error())
            }
            Err(_) => {
                log::warn!("write to player {} timed out", self.player_num);
                self.close();
                Err(self.disconnect_error())
            }
        }
    }

    fn take(&mut self, inbound: Option<Inbound>) -> Result<Option<Packet>, ConnectionError> {
        match inbound {
            Some(Inbound::Data(packet)) => Ok(Some(packet)),
            Some(Inbound::ChannelClosed) | None => {
                self.close();
                Err(self.disconnect_error())
            }
        }
    }

    /// Pop the next packet without waiting.
    pub fn try_receive(&mut self) -> Result<Option<Packet>, ConnectionError> {
        if self.disconnected {
            return Err(self.disconnect_error());
        }
        match self.inbox.try_recv() {
            Ok(inbound) => self.take(Some(inbound)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => self.take(None),
        }
    }

    /// Wait for the next packet. With a timeout, `Ok(None)` means nothing
    /// arrived in time. Dropping the future loses nothing.
    pub async fn wait_receive(
        &mut self,
        wait: Option<Duration>,
    ) -> Result<Option<Packet>, ConnectionError> {
        if self.disconnected {
            return Err(self.disconnect_error());
        }
        let inbound = match wait {
            Some(wait) => match timeout(wait, self.inbox.recv()).await {
                Ok(inbound) => inbound,
                Err(_) => return Ok(None),
            },
            None => self.inbox.recv().await,
        };
        self.take(inbound)
    }

    /// Resolves once the channel is known to have failed, without touching
    /// the receive queue.
    pub async fn closed(&mut self) {
        if self.disconnected {
            return;
        }
        // An error means the reader task was dropped, which is just as final.
        let _ = self.closed.wait_for(|closed| *closed).await;
    }

    /// Close the channel. Idempotent.
    pub fn close(&mut self) {
        if !self.disconnected {
            log::info!("closing connection to player {}", self.player_num);
        }
        self.disconnected = true;
        self.writer = None;
        self.reader.abort();
        self.inbox.close();
    }

    /// Whether the channel is known to have failed. A finished reader means
    /// the terminal marker is already queued.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected || self.reader.is_finished()
    }
}

impl Drop for PlayerConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncWriteExt, DuplexStream, duplex};

    use super::*;
    use crate::{
        game::entities::Card,
        net::{messages::NetworkCode, utils},
    };

    fn connection(seat: Seat) -> (PlayerConnection, DuplexStream) {
        let (server, client) = duplex(1024);
        (PlayerConnection::new(seat, Username::for_seat(seat), server), client)
    }

    async fn client_send(client: &mut DuplexStream, packet: &Packet) {
        write_frame(client, &packet.to_frame().unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn packets_arrive_in_order() {
        let (mut conn, mut client) = connection(1);
        client_send(&mut client, &Packet::ping()).await;
        client_send(&mut client, &Packet::play(Card::TWO_OF_CLUBS)).await;

        let first = conn.wait_receive(None).await.unwrap().unwrap();
        let second = conn.wait_receive(None).await.unwrap().unwrap();
        assert_eq!(first.code, NetworkCode::Ping);
        assert_eq!(second, Packet::play(Card::TWO_OF_CLUBS));
        assert_eq!(conn.try_receive().unwrap(), None);
    }

    #[tokio::test]
    async fn send_reaches_the_peer() {
        let (mut conn, mut client) = connection(0);
        conn.send(&Packet::new(NetworkCode::MakePlay)).await.unwrap();
        let payload = read_frame(&mut client).await.unwrap();
        assert_eq!(Packet::decode(&payload).unwrap().code, NetworkCode::MakePlay);
    }

    #[tokio::test]
    async fn wait_times_out_without_closing() {
        let (mut conn, _client) = connection(0);
        let received = conn.wait_receive(Some(Duration::from_millis(20))).await;
        assert_eq!(received, Ok(None));
        assert!(!conn.is_disconnected());
    }

    #[tokio::test]
    async fn malformed_packet_is_dropped() {
        let (mut conn, mut client) = connection(2);
        let garbage = [0, 0, 0, 2, 0xff, 0xff];
        client.write_all(&garbage).await.unwrap();
        client_send(&mut client, &Packet::ping()).await;

        let packet = conn.wait_receive(None).await.unwrap().unwrap();
        assert_eq!(packet.code, NetworkCode::Ping);
        assert!(!conn.is_disconnected());
    }

    #[tokio::test]
    async fn peer_close_disconnects_promptly() {
        let (mut conn, client) = connection(3);
        drop(client);
        let received = timeout(Duration::from_secs(1), conn.wait_receive(None))
            .await
            .unwrap();
        assert_eq!(received, Err(ConnectionError::Disconnected(3)));
        assert!(conn.is_disconnected());
        assert_eq!(conn.try_receive(), Err(ConnectionError::Disconnected(3)));
    }

    #[tokio::test]
    async fn oversized_frame_closes_channel() {
        let (mut conn, mut client) = connection(0);
        let size = (utils::MAX_MESSAGE_SIZE as u32 + 1).to_be_bytes();
        client.write_all(&size).await.unwrap();
        let received = conn.wait_receive(None).await;
        assert_eq!(received, Err(ConnectionError::Disconnected(0)));
    }

    #[tokio::test]
    async fn send_after_peer_eof_fails() {
        let (mut conn, mut client) = connection(2);
        client.shutdown().await.unwrap();
        timeout(Duration::from_secs(1), conn.closed()).await.unwrap();
        assert!(conn.is_disconnected());
        assert_eq!(
            conn.send(&Packet::ping()).await,
            Err(ConnectionError::Disconnected(2))
        );
        assert_eq!(conn.try_receive(), Err(ConnectionError::Disconnected(2)));
    }

    #[tokio::test]
    async fn closed_waits_for_the_peer() {
        let (mut conn, client) = connection(0);
        let pending = timeout(Duration::from_millis(20), conn.closed()).await;
        assert!(pending.is_err());
        drop(client);
        timeout(Duration::from_secs(1), conn.closed()).await.unwrap();

        // The terminal marker is still queued for the next receive.
        assert_eq!(conn.wait_receive(None).await, Err(ConnectionError::Disconnected(0)));
        conn.closed().await;
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let (mut conn, _client) = connection(1);
        conn.close();
        conn.close();
        assert_eq!(
            conn.send(&Packet::ping()).await,
            Err(ConnectionError::Disconnected(1))
        );
    }
}
