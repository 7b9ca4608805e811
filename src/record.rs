// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Key-addressed, orderable log contributions as folded by [`crate::buffer::RecordBuffer`].

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::instant::Instant;
use crate::ordering::OrderingValue;
use crate::row::Row;
use crate::slice::Slice;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

/// The identity a [`LogicalRecord`] is keyed by.
///
/// `Key` is used when a record-key field is declared; `Position` is used
/// when the reader is configured for position-based merging (§4.2,
/// `_row_index`), e.g. for tables with no natural primary key.
///
/// `Ord` is a purely technical requirement so `RecordKey` can key a
/// [`crossbeam_skiplist::SkipMap`]; its order carries no ordering semantics
/// of its own (that's what [`crate::ordering::OrderingValue`] is for).
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum RecordKey {
    /// Value of the declared record-key column.
    Key(Slice),
    /// `_row_index` of the base file row this log entry corresponds to.
    Position(u64),
}

/// What a [`LogicalRecord`] contributes to the merged snapshot.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordState {
    /// A live row.
    Present(Row),
    /// A deletion: the key is absent from the merged output unless a
    /// later, higher-ordering `Present` overrides it.
    Tombstone,
}

/// A single contribution to a key's history, as read from a log block (or,
/// in the merge driver, synthesized from a base-file row — carrying its own
/// precombine value when one is declared, or [`OrderingValue::Fallback`]
/// otherwise, which ranks below every concrete ordering value so an
/// undeclared-precombine base row still loses to any log contribution that
/// carries one).
///
/// The fold-semantics table of §4.3 is implemented by comparing two
/// `LogicalRecord`s' `ordering_value`s and keeping the winner's `state`.
#[derive(Clone, Debug, PartialEq)]
pub struct LogicalRecord {
    key: RecordKey,
    partition: Slice,
    state: RecordState,
    ordering_value: OrderingValue,
    source_instant: Instant,
}

impl LogicalRecord {
    /// Builds a new logical record.
    #[must_use]
    pub fn new(
        key: RecordKey,
        partition: impl Into<Slice>,
        state: RecordState,
        ordering_value: OrderingValue,
        source_instant: Instant,
    ) -> Self {
        Self {
            key,
            partition: partition.into(),
            state,
            ordering_value,
            source_instant,
        }
    }

    /// The record's key.
    #[must_use]
    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    /// The record's partition path.
    #[must_use]
    pub fn partition(&self) -> &[u8] {
        &self.partition
    }

    /// The record's contribution: a live row or a tombstone.
    #[must_use]
    pub fn state(&self) -> &RecordState {
        &self.state
    }

    /// The precombine (or fallback) ordering value.
    #[must_use]
    pub fn ordering_value(&self) -> &OrderingValue {
        &self.ordering_value
    }

    /// The instant this contribution was written at.
    #[must_use]
    pub fn source_instant(&self) -> &Instant {
        &self.source_instant
    }

    /// `true` if this record is a deletion.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        matches!(self.state, RecordState::Tombstone)
    }
}

impl Encode for RecordKey {
    fn encode_into<W: std::io::Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        match self {
            Self::Key(slice) => {
                writer.write_u8(0)?;
                slice.encode_into(writer)?;
            }
            Self::Position(pos) => {
                writer.write_u8(1)?;
                writer.write_u64::<BigEndian>(*pos)?;
            }
        }
        Ok(())
    }
}

impl Decode for RecordKey {
    fn decode_from<R: std::io::Read>(reader: &mut R) -> Result<Self, DecodeError> {
        Ok(match reader.read_u8()? {
            0 => Self::Key(Slice::decode_from(reader)?),
            1 => Self::Position(reader.read_u64::<BigEndian>()?),
            other => return Err(DecodeError::InvalidTag("RecordKey", u32::from(other))),
        })
    }
}

impl Encode for RecordState {
    fn encode_into<W: std::io::Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        match self {
            Self::Present(row) => {
                writer.write_u8(0)?;
                row.encode_into(writer)?;
            }
            Self::Tombstone => writer.write_u8(1)?,
        }
        Ok(())
    }
}

impl Decode for RecordState {
    fn decode_from<R: std::io::Read>(reader: &mut R) -> Result<Self, DecodeError> {
        Ok(match reader.read_u8()? {
            0 => Self::Present(Row::decode_from(reader)?),
            1 => Self::Tombstone,
            other => return Err(DecodeError::InvalidTag("RecordState", u32::from(other))),
        })
    }
}

impl Encode for LogicalRecord {
    fn encode_into<W: std::io::Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        self.key.encode_into(writer)?;
        self.partition.encode_into(writer)?;
        self.state.encode_into(writer)?;
        self.ordering_value.encode_into(writer)?;
        self.source_instant.encode_into(writer)?;
        Ok(())
    }
}

impl Decode for LogicalRecord {
    fn decode_from<R: std::io::Read>(reader: &mut R) -> Result<Self, DecodeError> {
        Ok(Self {
            key: RecordKey::decode_from(reader)?,
            partition: Slice::decode_from(reader)?,
            state: RecordState::decode_from(reader)?,
            ordering_value: OrderingValue::decode_from(reader)?,
            source_instant: Instant::decode_from(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::ScalarValue;

    fn present(ordering: i64, instant: &str) -> LogicalRecord {
        LogicalRecord::new(
            RecordKey::Key(Slice::from("k1")),
            Slice::from("p1"),
            RecordState::Present(Row::new(vec![ScalarValue::Int64(ordering)])),
            OrderingValue::Integer(ordering),
            Instant::new(instant),
        )
    }

    #[test]
    fn higher_ordering_value_wins_regardless_of_instant() {
        let older_but_higher = present(10, "100");
        let newer_but_lower = present(1, "200");
        assert!(older_but_higher.ordering_value() > newer_but_lower.ordering_value());
    }

    #[test]
    fn logical_record_roundtrips_through_encode_decode() {
        let record = present(10, "100");
        let bytes = record.encode_into_vec();
        let decoded = LogicalRecord::decode_from(&mut std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn tombstone_state_is_reported() {
        let tombstone = LogicalRecord::new(
            RecordKey::Position(3),
            Slice::from("p1"),
            RecordState::Tombstone,
            OrderingValue::Null,
            Instant::new("100"),
        );
        assert!(tombstone.is_tombstone());
    }
}
