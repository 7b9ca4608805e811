// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Header/footer key-value maps carried by every log block frame.

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// Closed set of header/footer map keys (§6).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum HeaderKey {
    /// Instant the block was written at.
    InstantTime,
    /// Serialized schema the block's body was written under.
    Schema,
    /// For `ROLLBACK` command blocks: the instant being invalidated.
    TargetInstantTime,
    /// Command block subtype, currently only `ROLLBACK`.
    CommandBlockType,
    /// Instants folded into this block by a prior compaction.
    CompactedBlockTimes,
    /// Row positions this block's records refer to (position-mode logs).
    RecordPositions,
    /// Opaque identifier correlating blocks across a multi-block write.
    BlockIdentifier,
}

impl HeaderKey {
    const fn to_u32(self) -> u32 {
        match self {
            Self::InstantTime => 0,
            Self::Schema => 1,
            Self::TargetInstantTime => 2,
            Self::CommandBlockType => 3,
            Self::CompactedBlockTimes => 4,
            Self::RecordPositions => 5,
            Self::BlockIdentifier => 6,
        }
    }

    fn from_u32(value: u32) -> Result<Self, DecodeError> {
        Ok(match value {
            0 => Self::InstantTime,
            1 => Self::Schema,
            2 => Self::TargetInstantTime,
            3 => Self::CommandBlockType,
            4 => Self::CompactedBlockTimes,
            5 => Self::RecordPositions,
            6 => Self::BlockIdentifier,
            other => return Err(DecodeError::InvalidTag("HeaderKey", other)),
        })
    }
}

/// A header or footer key-value map.
///
/// Values are opaque bytes; callers interpret them per key (most are
/// UTF-8 strings, e.g. `InstantTime`).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HeaderMap(BTreeMap<HeaderKey, Vec<u8>>);

impl HeaderMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning `self` for chained construction.
    #[must_use]
    pub fn with(mut self, key: HeaderKey, value: impl Into<Vec<u8>>) -> Self {
        self.0.insert(key, value.into());
        self
    }

    /// Returns the raw bytes for `key`.
    #[must_use]
    pub fn get(&self, key: HeaderKey) -> Option<&[u8]> {
        self.0.get(&key).map(Vec::as_slice)
    }

    /// Returns the value for `key` decoded as a UTF-8 string.
    #[must_use]
    pub fn get_str(&self, key: HeaderKey) -> Option<&str> {
        self.get(key).and_then(|b| std::str::from_utf8(b).ok())
    }
}

impl Encode for HeaderMap {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u32::<BigEndian>(self.0.len() as u32)?;

        for (key, value) in &self.0 {
            writer.write_u32::<BigEndian>(key.to_u32())?;
            #[allow(clippy::cast_possible_truncation)]
            writer.write_u32::<BigEndian>(value.len() as u32)?;
            writer.write_all(value)?;
        }

        Ok(())
    }
}

impl Decode for HeaderMap {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let count = reader.read_u32::<BigEndian>()?;
        let mut map = BTreeMap::new();

        for _ in 0..count {
            let key_enum = reader.read_u32::<BigEndian>()?;
            let key = HeaderKey::from_u32(key_enum)?;

            let len = reader.read_u32::<BigEndian>()?;
            let mut value = vec![0u8; len as usize];
            reader.read_exact(&mut value)?;

            map.insert(key, value);
        }

        Ok(Self(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_map_roundtrips() {
        let map = HeaderMap::new()
            .with(HeaderKey::InstantTime, b"101".to_vec())
            .with(HeaderKey::Schema, b"some-schema".to_vec());

        let bytes = map.encode_into_vec();
        let decoded = HeaderMap::decode_from(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(map, decoded);
        assert_eq!(decoded.get_str(HeaderKey::InstantTime), Some("101"));
    }

    #[test]
    fn unknown_key_enum_fails_decode() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&99u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());

        let err = HeaderMap::decode_from(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidTag("HeaderKey", 99)));
    }
}
