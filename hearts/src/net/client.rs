//! A low-level TCP Hearts client.
//!
//! This client is blocking and so is primarily used as a testing utility
//! and by the bots rather than as an actual game client.

use anyhow::{Error, bail};
use std::{
    net::{SocketAddr, TcpStream},
    thread,
    time::Duration,
};

use super::{
    messages::{NetworkCode, Packet},
    utils,
};
use crate::game::entities::{Card, Seat, Username};

/// Default timeout for reading from the server. Generous since other
/// seats may take a while to play.
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for writing to the server.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// A blocking TCP client seated at a Hearts server.
pub struct Client {
    /// Seat the server assigned.
    pub player_num: Seat,
    /// Name the server currently knows this client by.
    pub name: Username,
    /// The underlying TCP stream.
    pub stream: TcpStream,
}

impl Client {
    /// Connect to a Hearts server and wait to be seated.
    ///
    /// This method attempts to connect with backoff, trying three times
    /// with decreasing timeouts (1s, 500ms, 100ms).
    ///
    /// # Errors
    ///
    /// Returns an error if unable to connect or if the server denies the
    /// connection.
    pub fn connect(addr: &SocketAddr) -> Result<Self, Error> {
        let mut connect_timeouts = vec![
            Duration::from_secs(1),
            Duration::from_millis(500),
            Duration::from_millis(100),
        ];
        while let Some(connect_timeout) = connect_timeouts.pop() {
            match TcpStream::connect_timeout(addr, connect_timeout) {
                Ok(mut stream) => {
                    stream.set_read_timeout(Some(READ_TIMEOUT))?;
                    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
                    let packet = Self::read(&mut stream)?;
                    return match packet.code {
                        NetworkCode::ConnectionAccepted => Ok(Self {
                            player_num: packet.seat("player_num")?,
                            name: Username::new(packet.str("name")?),
                            stream,
                        }),
                        NetworkCode::ConnectionDenied => {
                            bail!("connection denied: {}", packet.str("reason").unwrap_or_default())
                        }
                        _ => bail!("invalid server response: {packet}"),
                    };
                }
                _ => thread::sleep(connect_timeout),
            }
        }
        bail!("couldn't connect to {addr}")
    }

    fn read(stream: &mut TcpStream) -> Result<Packet, Error> {
        let packet: Packet = utils::read_prefixed(stream)?;
        packet.check_version()?;
        Ok(packet)
    }

    /// Send any packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet cannot be sent to the server.
    pub fn send(&mut self, packet: &Packet) -> Result<(), Error> {
        utils::write_prefixed(&mut self.stream, packet)?;
        Ok(())
    }

    /// Mark this seat ready, optionally renaming it.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet cannot be sent to the server.
    pub fn start_game(&mut self, name: Option<&str>) -> Result<(), Error> {
        let name = name.map(Username::new);
        if let Some(name) = &name {
            self.name = name.clone();
        }
        self.send(&Packet::start_game(name.as_ref()))
    }

    /// Play a card into the current trick.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet cannot be sent to the server.
    pub fn play(&mut self, card: Card) -> Result<(), Error> {
        self.send(&Packet::play(card))
    }

    /// Submit the three cards to pass this round.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet cannot be sent to the server.
    pub fn send_warheads(&mut self, cards: &[Card]) -> Result<(), Error> {
        self.send(&Packet::warheads(cards))
    }

    /// Ask the server for a `PING` back.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet cannot be sent to the server.
    pub fn ping(&mut self) -> Result<(), Error> {
        self.send(&Packet::ping())
    }

    /// Replace [`READ_TIMEOUT`]. `None` waits on the server indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout is zero.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), Error> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Block until the next packet arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or times out, or the packet is
    /// from an incompatible protocol version.
    pub fn recv(&mut self) -> Result<Packet, Error> {
        Self::read(&mut self.stream)
    }

    /// Skip packets until one with `code` arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if any read fails before `code` shows up.
    pub fn recv_code(&mut self, code: NetworkCode) -> Result<Packet, Error> {
        loop {
            let packet = self.recv()?;
            if packet.code == code {
                return Ok(packet);
            }
        }
    }
}
