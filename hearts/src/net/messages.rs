use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

use super::{
    errors::{Result, SerializationError},
    protocol_version::ProtocolVersion,
    utils,
};
use crate::game::entities::{Card, Seat, Username};

/// Verb of a packet. The discriminant is the code's wire id and never
/// changes once assigned, whatever order the variants are listed in.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum NetworkCode {
    // Both directions.
    Ping = 0,

    // Client to server.
    StartGame = 1,
    Play = 2,
    Warheads = 3,

    // Connection lifecycle.
    ConnectionAccepted = 10,
    ConnectionDenied = 11,
    PlayerDisconnected = 12,

    // Round phase.
    RoundStart = 20,
    WaitForHand = 21,
    SendWarheads = 22,
    InvalidWarheads = 23,
    SuccessfulWarheads = 24,
    RoundEnd = 25,
    GameEnd = 26,

    // Trick phase.
    TrickStart = 30,
    PlayTwoOfClubs = 31,
    MakePlay = 32,
    InvalidPlay = 33,
    SuccessfulPlay = 34,
    WaitForTurnPlayer = 35,
    WaitForNewPlay = 36,
    WaitForLeadingPlayer = 37,
    TrickEnd = 38,
}

impl NetworkCode {
    pub const ALL: [NetworkCode; 23] = [
        Self::Ping,
        Self::StartGame,
        Self::Play,
        Self::Warheads,
        Self::ConnectionAccepted,
        Self::ConnectionDenied,
        Self::PlayerDisconnected,
        Self::RoundStart,
        Self::WaitForHand,
        Self::SendWarheads,
        Self::InvalidWarheads,
        Self::SuccessfulWarheads,
        Self::RoundEnd,
        Self::GameEnd,
        Self::TrickStart,
        Self::PlayTwoOfClubs,
        Self::MakePlay,
        Self::InvalidPlay,
        Self::SuccessfulPlay,
        Self::WaitForTurnPlayer,
        Self::WaitForNewPlay,
        Self::WaitForLeadingPlayer,
        Self::TrickEnd,
    ];

    pub const fn wire_id(self) -> u16 {
        self as u16
    }
}

impl From<NetworkCode> for u16 {
    fn from(code: NetworkCode) -> Self {
        code.wire_id()
    }
}

impl TryFrom<u16> for NetworkCode {
    type Error = SerializationError;

    fn try_from(value: u16) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|code| code.wire_id() == value)
            .ok_or(SerializationError::UnknownCode(value))
    }
}

impl fmt::Display for NetworkCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Ping => "PING",
            Self::StartGame => "START_GAME",
            Self::Play => "PLAY",
            Self::Warheads => "WARHEADS",
            Self::ConnectionAccepted => "CONNECTION_ACCEPTED",
            Self::ConnectionDenied => "CONNECTION_DENIED",
            Self::PlayerDisconnected => "PLAYER_DISCONNECTED",
            Self::RoundStart => "ROUND_START",
            Self::WaitForHand => "WAIT_FOR_HAND",
            Self::SendWarheads => "SEND_WARHEADS",
            Self::InvalidWarheads => "INVALID_WARHEADS",
            Self::SuccessfulWarheads => "SUCCESSFUL_WARHEADS",
            Self::RoundEnd => "ROUND_END",
            Self::GameEnd => "GAME_END",
            Self::TrickStart => "TRICK_START",
            Self::PlayTwoOfClubs => "PLAY_TWO_OF_CLUBS",
            Self::MakePlay => "MAKE_PLAY",
            Self::InvalidPlay => "INVALID_PLAY",
            Self::SuccessfulPlay => "SUCCESSFUL_PLAY",
            Self::WaitForTurnPlayer => "WAIT_FOR_TURN_PLAYER",
            Self::WaitForNewPlay => "WAIT_FOR_NEW_PLAY",
            Self::WaitForLeadingPlayer => "WAIT_FOR_LEADING_PLAYER",
            Self::TrickEnd => "TRICK_END",
        };
        write!(f, "{repr}")
    }
}

/// A packet field value.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Value {
    Int(i64),
    Str(String),
    IntList(Vec<i64>),
}

/// One framed unit on the wire: a verb plus keyed fields.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Packet {
    /// Raw protocol version so packets from unknown versions can still be
    /// identified and refused.
    version: u8,
    pub code: NetworkCode,
    pub fields: BTreeMap<String, Value>,
}

impl Packet {
    pub fn new(code: NetworkCode) -> Self {
        Self {
            version: ProtocolVersion::current().into(),
            code,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_int(self, key: &str, value: impl Into<i64>) -> Self {
        self.with(key, Value::Int(value.into()))
    }

    #[must_use]
    pub fn with_seat(self, key: &str, seat: Seat) -> Self {
        self.with(key, Value::Int(seat as i64))
    }

    #[must_use]
    pub fn with_str(self, key: &str, value: impl ToString) -> Self {
        self.with(key, Value::Str(value.to_string()))
    }

    #[must_use]
    pub fn with_ints(self, key: &str, values: Vec<i64>) -> Self {
        self.with(key, Value::IntList(values))
    }

    #[must_use]
    pub fn with_cards(self, key: &str, cards: &[Card]) -> Self {
        self.with_ints(key, cards.iter().map(|c| i64::from(c.number())).collect())
    }

    pub fn ping() -> Self {
        Self::new(NetworkCode::Ping)
    }

    /// `START_GAME`, optionally introducing the player by name.
    pub fn start_game(name: Option<&Username>) -> Self {
        let packet = Self::new(NetworkCode::StartGame);
        match name {
            Some(name) => packet.with_str("name", name),
            None => packet,
        }
    }

    pub fn play(card: Card) -> Self {
        Self::new(NetworkCode::Play).with_int("play", card.number())
    }

    pub fn warheads(cards: &[Card]) -> Self {
        Self::new(NetworkCode::Warheads).with_cards("warheads", cards)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn get(&self, key: &str) -> Result<&Value> {
        self.fields
            .get(key)
            .ok_or_else(|| SerializationError::MissingField(key.to_string()))
    }

    pub fn int(&self, key: &str) -> Result<i64> {
        match self.get(key)? {
            Value::Int(value) => Ok(*value),
            _ => Err(wrong_type(key, "an integer")),
        }
    }

    pub fn seat(&self, key: &str) -> Result<Seat> {
        let value = self.int(key)?;
        Seat::try_from(value).map_err(|_| SerializationError::WrongType {
            key: key.to_string(),
            expected: "a seat",
        })
    }

    pub fn str(&self, key: &str) -> Result<&str> {
        match self.get(key)? {
            Value::Str(value) => Ok(value),
            _ => Err(wrong_type(key, "a string")),
        }
    }

    pub fn int_list(&self, key: &str) -> Result<&[i64]> {
        match self.get(key)? {
            Value::IntList(values) => Ok(values),
            _ => Err(wrong_type(key, "an integer list")),
        }
    }

    /// Encode into a complete frame, length prefix included.
    pub fn to_frame(&self) -> Result<Vec<u8>> {
        utils::encode_frame(self)
    }

    /// Decode a frame payload, refusing packets from incompatible
    /// protocol versions.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let packet: Self = utils::decode(payload)?;
        packet.check_version()?;
        Ok(packet)
    }

    pub fn check_version(&self) -> Result<()> {
        let version = ProtocolVersion::try_from(self.version)
            .map_err(|_| SerializationError::UnsupportedVersion(self.version))?;
        if version.is_compatible_with(&ProtocolVersion::current()) {
            Ok(())
        } else {
            Err(SerializationError::UnsupportedVersion(self.version))
        }
    }
}

fn wrong_type(key: &str, expected: &'static str) -> SerializationError {
    SerializationError::WrongType {
        key: key.to_string(),
        expected,
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code)?;
        for (key, value) in &self.fields {
            match value {
                Value::Int(v) => write!(f, " {key}={v}")?,
                Value::Str(v) => write!(f, " {key}={v:?}")?,
                Value::IntList(v) => write!(f, " {key}={v:?}")?,
            }
        }
        Ok(())
    }
}
