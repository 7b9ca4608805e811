// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The totally ordered "ordering value" used by the `EVENT_TIME` merge rule
//! and by the tombstone-monotonicity invariant.

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::instant::Instant;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

/// Value of a record's precombine column, or the positional fallback used
/// when no precombine column is declared.
///
/// `Ord` gives a total order: numeric variants compare by value, `Text`
/// compares byte-lexicographically, and `Fallback` compares
/// `(instant, block_seq, row_seq)` — exactly the tuple §4.3 specifies for
/// records with no declared precombine column.
///
/// [Open question resolution, see `SPEC_FULL.md`]: a `Null` ordering value
/// is treated as the minimum of the order. A tombstone with `Null` ordering
/// therefore never outranks (and so never suppresses) a present value, and
/// is itself always beaten by a present value with any concrete ordering —
/// the conservative reading that avoids silently losing data to a
/// tombstone that carries no ordering information.
#[derive(Clone, Debug, PartialEq)]
pub enum OrderingValue {
    /// No ordering information at all.
    Null,
    /// Signed integer ordering (covers `Int32`/`Int64` precombine columns).
    Integer(i64),
    /// Floating point ordering.
    Float(f64),
    /// Text ordering, compared byte-lexicographically.
    Text(String),
    /// `(instant_time, block_seq, row_seq)` fallback used when no
    /// precombine column is declared (§4.3).
    Fallback(Instant, u64, u64),
}

impl Eq for OrderingValue {}

impl OrderingValue {
    /// Converts a precombine column's decoded value into an ordering value.
    ///
    /// `Binary` has no natural total order and is treated as [`Self::Null`]
    /// (the minimum), so a binary precombine column never wins a fold — it
    /// only ever falls back to instant order.
    #[must_use]
    pub fn from_scalar(value: &crate::row::ScalarValue) -> Self {
        use crate::row::ScalarValue;
        match value {
            ScalarValue::Null | ScalarValue::Binary(_) => Self::Null,
            ScalarValue::Int32(v) => Self::Integer(i64::from(*v)),
            ScalarValue::Int64(v) => Self::Integer(*v),
            ScalarValue::Float32(v) => Self::Float(f64::from(*v)),
            ScalarValue::Float64(v) => Self::Float(*v),
            ScalarValue::Boolean(v) => Self::Integer(i64::from(*v)),
            ScalarValue::String(v) => Self::Text(v.to_string()),
        }
    }

    /// Decodes a delete block's `(ordering_wrapper_tag, ordering_bytes)` pair
    /// (§6) into an ordering value, reusing the same tag byte this type's
    /// own [`Encode`] impl writes.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidTag`] if `tag` is not one of the five
    /// known wrapper tags.
    pub fn from_wrapper(tag: u32, bytes: &[u8]) -> Result<Self, DecodeError> {
        let Ok(tag) = u8::try_from(tag) else {
            return Err(DecodeError::InvalidTag("OrderingValue", tag));
        };
        let mut framed = Vec::with_capacity(bytes.len() + 1);
        framed.push(tag);
        framed.extend_from_slice(bytes);
        Self::decode_from(&mut std::io::Cursor::new(framed))
    }
}

/// Discriminant used only to keep variants of different kinds (which cannot
/// be meaningfully compared, e.g. `Integer` vs `Fallback`) in a
/// deterministic — if surprising — total order rather than panicking.
///
/// `Null` ranks lowest (no ordering information at all), `Fallback` ranks
/// next (the positional tuple used when no precombine column is declared —
/// in particular the rank a base-file row is synthesized with, so it always
/// loses a fold against any log contribution carrying a concrete precombine
/// value), and `Integer`/`Float`/`Text` rank highest as genuine precombine
/// values.
fn rank(v: &OrderingValue) -> u8 {
    match v {
        OrderingValue::Null => 0,
        OrderingValue::Fallback(..) => 1,
        OrderingValue::Integer(_) => 2,
        OrderingValue::Float(_) => 2,
        OrderingValue::Text(_) => 2,
    }
}

impl PartialOrd for OrderingValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderingValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering::Equal;
        use OrderingValue::{Fallback, Float, Integer, Null, Text};

        match (self, other) {
            (Null, Null) => Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b).unwrap_or(Equal),
            (Integer(a), Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Equal),
            (Float(a), Integer(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Equal),
            (Text(a), Text(b)) => a.cmp(b),
            (Fallback(ia, ba, ra), Fallback(ib, bb, rb)) => {
                (ia, ba, ra).cmp(&(ib, bb, rb))
            }
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl Encode for OrderingValue {
    fn encode_into<W: std::io::Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        match self {
            Self::Null => writer.write_u8(0)?,
            Self::Integer(v) => {
                writer.write_u8(1)?;
                writer.write_i64::<BigEndian>(*v)?;
            }
            Self::Float(v) => {
                writer.write_u8(2)?;
                writer.write_f64::<BigEndian>(*v)?;
            }
            Self::Text(v) => {
                writer.write_u8(3)?;
                #[allow(clippy::cast_possible_truncation)]
                writer.write_u32::<BigEndian>(v.len() as u32)?;
                writer.write_all(v.as_bytes())?;
            }
            Self::Fallback(instant, block_seq, row_seq) => {
                writer.write_u8(4)?;
                instant.encode_into(writer)?;
                writer.write_u64::<BigEndian>(*block_seq)?;
                writer.write_u64::<BigEndian>(*row_seq)?;
            }
        }
        Ok(())
    }
}

impl Decode for OrderingValue {
    fn decode_from<R: std::io::Read>(reader: &mut R) -> Result<Self, DecodeError> {
        Ok(match reader.read_u8()? {
            0 => Self::Null,
            1 => Self::Integer(reader.read_i64::<BigEndian>()?),
            2 => Self::Float(reader.read_f64::<BigEndian>()?),
            3 => {
                let len = reader.read_u32::<BigEndian>()?;
                let mut bytes = vec![0u8; len as usize];
                reader.read_exact(&mut bytes)?;
                Self::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
            4 => {
                let instant = Instant::decode_from(reader)?;
                let block_seq = reader.read_u64::<BigEndian>()?;
                let row_seq = reader.read_u64::<BigEndian>()?;
                Self::Fallback(instant, block_seq, row_seq)
            }
            other => return Err(DecodeError::InvalidTag("OrderingValue", u32::from(other))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_minimal() {
        assert!(OrderingValue::Null < OrderingValue::Integer(i64::MIN));
        assert!(OrderingValue::Null < OrderingValue::Text(String::new()));
    }

    #[test]
    fn fallback_ranks_below_every_concrete_ordering_value() {
        let fallback = OrderingValue::Fallback(Instant::new("999"), u64::MAX, u64::MAX);
        assert!(fallback < OrderingValue::Integer(i64::MIN));
        assert!(fallback < OrderingValue::Text(String::new()));
        assert!(OrderingValue::Null < fallback);
    }

    #[test]
    fn fallback_orders_by_instant_then_seqs() {
        let a = OrderingValue::Fallback(Instant::new("101"), 0, 0);
        let b = OrderingValue::Fallback(Instant::new("102"), 0, 0);
        assert!(a < b);

        let c = OrderingValue::Fallback(Instant::new("101"), 1, 0);
        assert!(a < c);
    }

    #[test]
    fn integer_and_float_compare_numerically() {
        assert!(OrderingValue::Integer(1) < OrderingValue::Integer(2));
        assert!(OrderingValue::Float(1.5) < OrderingValue::Float(2.5));
        assert!(OrderingValue::Integer(1) < OrderingValue::Float(1.5));
    }

    #[test]
    fn from_scalar_maps_binary_to_null() {
        use crate::row::ScalarValue;
        assert_eq!(OrderingValue::from_scalar(&ScalarValue::Binary(crate::slice::Slice::from(b"x".as_slice()))), OrderingValue::Null);
        assert_eq!(OrderingValue::from_scalar(&ScalarValue::Int32(7)), OrderingValue::Integer(7));
    }

    #[test]
    fn from_wrapper_roundtrips_integer() {
        let encoded = OrderingValue::Integer(42).encode_into_vec();
        let value = OrderingValue::from_wrapper(1, &encoded[1..]).unwrap();
        assert_eq!(value, OrderingValue::Integer(42));
    }

    #[test]
    fn roundtrips_through_encode_decode() {
        for value in [
            OrderingValue::Null,
            OrderingValue::Integer(-7),
            OrderingValue::Float(3.25),
            OrderingValue::Text("abc".to_owned()),
            OrderingValue::Fallback(Instant::new("101"), 2, 9),
        ] {
            let bytes = value.encode_into_vec();
            let decoded = OrderingValue::decode_from(&mut std::io::Cursor::new(bytes)).unwrap();
            assert_eq!(value, decoded);
        }
    }
}
