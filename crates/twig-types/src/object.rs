use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Content-addressed identifier for a blob, tree or commit.
///
/// An `ObjectId` is a 32-byte BLAKE3 hash. Identical content always produces
/// the same `ObjectId`, which is what lets a patched tree share untouched
/// subtrees with its base by reference.
///
/// Serialized as a 64-character lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    /// Length of the raw hash in bytes.
    pub const LEN: usize = 32;

    /// Compute an `ObjectId` from raw bytes (no domain separation).
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Wrap a pre-computed hash.
    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The null object ID (all zeros). Never names a stored object.
    pub const fn null() -> Self {
        Self([0u8; 32])
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated hex (first 8 characters), for logs and display.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a 64-character hex string. Surrounding whitespace is
    /// ignored so that ids read back from ref files parse directly.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s.trim()).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| TypeError::InvalidLength {
                expected: Self::LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for ObjectId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<ObjectId> for [u8; 32] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn from_bytes_is_deterministic() {
        let id1 = ObjectId::from_bytes(b"hello world");
        let id2 = ObjectId::from_bytes(b"hello world");
        assert_eq!(id1, id2);
    }

    #[test]
    fn different_data_produces_different_ids() {
        assert_ne!(ObjectId::from_bytes(b"hello"), ObjectId::from_bytes(b"world"));
    }

    #[test]
    fn null_is_all_zeros() {
        let null = ObjectId::null();
        assert!(null.is_null());
        assert_eq!(null.as_bytes(), &[0u8; 32]);
        assert!(!ObjectId::from_bytes(b"x").is_null());
    }

    #[test]
    fn short_hex_is_prefix_of_full_hex() {
        let id = ObjectId::from_bytes(b"test");
        assert_eq!(id.short_hex().len(), 8);
        assert!(id.to_hex().starts_with(&id.short_hex()));
    }

    #[test]
    fn display_is_full_hex() {
        let id = ObjectId::from_bytes(b"test");
        let display = format!("{id}");
        assert_eq!(display.len(), 64);
        assert_eq!(display, id.to_hex());
    }

    #[test]
    fn parse_tolerates_trailing_newline() {
        let id = ObjectId::from_bytes(b"ref file");
        let parsed: ObjectId = format!("{id}\n").parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            ObjectId::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
        assert_eq!(
            ObjectId::from_hex("abcd"),
            Err(TypeError::InvalidLength {
                expected: 32,
                actual: 2
            })
        );
    }

    #[test]
    fn serializes_as_hex_string() {
        let id = ObjectId::from_bytes(b"serde test");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn deserialize_rejects_short_hex() {
        let result: Result<ObjectId, _> = serde_json::from_str("\"abcd\"");
        assert!(result.is_err());
    }

    #[test]
    fn ordering_is_bytewise() {
        let id1 = ObjectId::from_hash([0; 32]);
        let id2 = ObjectId::from_hash([1; 32]);
        assert!(id1 < id2);
    }

    proptest! {
        #[test]
        fn hex_roundtrip(bytes in proptest::array::uniform32(any::<u8>())) {
            let id = ObjectId::from_hash(bytes);
            prop_assert_eq!(ObjectId::from_hex(&id.to_hex()).unwrap(), id);
        }
    }
}
