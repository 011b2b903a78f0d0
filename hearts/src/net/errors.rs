//! Network error types for packet encoding and player channels.

use thiserror::Error;

use crate::game::entities::Seat;

/// Errors that make a packet unusable. The packet is logged and dropped;
/// the connection it arrived on stays open.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// Failed to encode a packet
    #[error("failed to encode packet: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Failed to decode a packet
    #[error("failed to decode packet: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// Packet size exceeded maximum allowed
    #[error("packet size {actual} exceeds maximum {max}")]
    MessageTooLarge { actual: usize, max: usize },

    /// Payload held more than one value
    #[error("{0} trailing bytes after packet")]
    TrailingBytes(usize),

    /// Packet from a protocol version we can't read
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    /// Wire id that doesn't name a network code
    #[error("unknown network code {0}")]
    UnknownCode(u16),

    /// Required field is absent
    #[error("missing field \"{0}\"")]
    MissingField(String),

    /// Field holds a different kind of value
    #[error("field \"{key}\" isn't {expected}")]
    WrongType { key: String, expected: &'static str },
}

/// A player's channel has failed. This is terminal for the connection and
/// aborts whatever trick or round was waiting on it.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ConnectionError {
    #[error("player {0} disconnected")]
    Disconnected(Seat),

    /// Several channels failed during one multicast.
    #[error("players {0:?} disconnected")]
    MultiDisconnected(Vec<Seat>),
}

impl ConnectionError {
    /// Build the error for a set of failed seats. Returns `None` when no
    /// seat failed.
    pub fn from_seats(mut seats: Vec<Seat>) -> Option<Self> {
        seats.sort_unstable();
        seats.dedup();
        match seats.len() {
            0 => None,
            1 => Some(Self::Disconnected(seats[0])),
            _ => Some(Self::MultiDisconnected(seats)),
        }
    }

    pub fn seats(&self) -> Vec<Seat> {
        match self {
            Self::Disconnected(seat) => vec![*seat],
            Self::MultiDisconnected(seats) => seats.clone(),
        }
    }

    /// Fold another failure into this one.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        let mut seats = self.seats();
        seats.extend(other.seats());
        Self::from_seats(seats).unwrap_or(self)
    }
}

/// Result type for serialization operations
pub type Result<T> = std::result::Result<T, SerializationError>;
