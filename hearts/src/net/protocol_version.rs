//! Protocol versioning for packets on the wire.

use serde::{Deserialize, Serialize};

/// Version stamped on every packet. Decoders refuse packets from versions
/// they aren't compatible with instead of guessing at their fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ProtocolVersion {
    /// V1: length-prefixed packets with a network code and keyed fields
    V1 = 1,
}

impl ProtocolVersion {
    /// Get the current protocol version
    pub fn current() -> Self {
        ProtocolVersion::V1
    }

    /// Check if this version is compatible with another
    pub fn is_compatible_with(&self, other: &ProtocolVersion) -> bool {
        matches!((self, other), (ProtocolVersion::V1, ProtocolVersion::V1))
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl From<ProtocolVersion> for u8 {
    fn from(version: ProtocolVersion) -> Self {
        version as u8
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            other => Err(format!("unknown protocol version {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bincode::config;
    use bincode::serde::{decode_from_slice, encode_to_vec};
    use serde::{Serialize, de::DeserializeOwned};

    fn serialize_value<T: Serialize>(value: &T) -> Vec<u8> {
        encode_to_vec(value, config::standard()).unwrap()
    }

    fn deserialize_value<T: DeserializeOwned>(bytes: &[u8]) -> T {
        decode_from_slice(bytes, config::standard()).unwrap().0
    }

    #[test]
    fn test_current_version() {
        assert_eq!(ProtocolVersion::current(), ProtocolVersion::V1);
    }

    #[test]
    fn test_compatibility() {
        assert!(ProtocolVersion::V1.is_compatible_with(&ProtocolVersion::V1));
    }

    #[test]
    fn test_serialization() {
        let v1 = ProtocolVersion::V1;
        let serialized = serialize_value(&v1);
        assert_eq!(serialized, vec![1]);
        let deserialized: ProtocolVersion = deserialize_value(&serialized);
        assert_eq!(v1, deserialized);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let serialized = serialize_value(&9u8);
        assert!(decode_from_slice::<ProtocolVersion, _>(&serialized, config::standard()).is_err());
    }
}
