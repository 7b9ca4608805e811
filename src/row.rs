// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Row representation shared by the base-file reader, log blocks and the
//! bootstrap merger.

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::schema::Schema;
use crate::slice::Slice;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::sync::Arc;

/// A single column value.
#[derive(Clone, Debug, PartialEq)]
pub enum ScalarValue {
    /// SQL NULL.
    Null,
    /// UTF-8 string.
    String(Arc<str>),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// 32-bit float. Not `Eq`/`Ord`; compared via `OrderingValue` for merge purposes.
    Float32(f32),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Boolean(bool),
    /// Opaque bytes.
    Binary(Slice),
}

/// A materialized record, as wide as the schema it was produced under
/// (`required_schema` for intermediate stages, `requested_schema` only
/// after the final projection of §4.6).
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    values: Arc<[ScalarValue]>,
}

impl Row {
    /// Builds a row from column values in schema order.
    #[must_use]
    pub fn new(values: Vec<ScalarValue>) -> Self {
        Self {
            values: values.into(),
        }
    }

    /// Returns the column values in schema order.
    #[must_use]
    pub fn values(&self) -> &[ScalarValue] {
        &self.values
    }

    /// Returns the value at `index`, the way [`Schema::index_of`] returns it.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ScalarValue> {
        self.values.get(index)
    }

    /// Returns the value of column `name` under `schema`.
    #[must_use]
    pub fn get_named<'a>(&'a self, schema: &Schema, name: &str) -> Option<&'a ScalarValue> {
        schema.index_of(name).and_then(|i| self.get(i))
    }

    /// Projects this row from `from` schema down to `to` schema (§4.6,
    /// final emission step). `to` must be a subset of `from`.
    ///
    /// # Panics
    ///
    /// Panics if a column of `to` is absent from `from` — callers must only
    /// invoke this after establishing `to.is_subset_of(from)`.
    #[must_use]
    pub fn project(&self, from: &Schema, to: &Schema) -> Self {
        let values = to
            .fields()
            .iter()
            .map(|f| {
                let idx = from
                    .index_of(&f.name)
                    .expect("projection target column must exist in source schema");
                self.values
                    .get(idx)
                    .cloned()
                    .unwrap_or(ScalarValue::Null)
            })
            .collect();

        Self::new(values)
    }
}

impl Encode for ScalarValue {
    fn encode_into<W: std::io::Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        match self {
            Self::Null => writer.write_u8(0)?,
            Self::String(v) => {
                writer.write_u8(1)?;
                Slice::from(v.as_ref()).encode_into(writer)?;
            }
            Self::Int32(v) => {
                writer.write_u8(2)?;
                writer.write_i32::<BigEndian>(*v)?;
            }
            Self::Int64(v) => {
                writer.write_u8(3)?;
                writer.write_i64::<BigEndian>(*v)?;
            }
            Self::Float32(v) => {
                writer.write_u8(4)?;
                writer.write_f32::<BigEndian>(*v)?;
            }
            Self::Float64(v) => {
                writer.write_u8(5)?;
                writer.write_f64::<BigEndian>(*v)?;
            }
            Self::Boolean(v) => {
                writer.write_u8(6)?;
                writer.write_u8(u8::from(*v))?;
            }
            Self::Binary(v) => {
                writer.write_u8(7)?;
                v.encode_into(writer)?;
            }
        }
        Ok(())
    }
}

impl Decode for ScalarValue {
    fn decode_from<R: std::io::Read>(reader: &mut R) -> Result<Self, DecodeError> {
        Ok(match reader.read_u8()? {
            0 => Self::Null,
            1 => {
                let bytes = Slice::decode_from(reader)?;
                Self::String(String::from_utf8_lossy(&bytes).into_owned().into())
            }
            2 => Self::Int32(reader.read_i32::<BigEndian>()?),
            3 => Self::Int64(reader.read_i64::<BigEndian>()?),
            4 => Self::Float32(reader.read_f32::<BigEndian>()?),
            5 => Self::Float64(reader.read_f64::<BigEndian>()?),
            6 => Self::Boolean(reader.read_u8()? != 0),
            7 => Self::Binary(Slice::decode_from(reader)?),
            other => return Err(DecodeError::InvalidTag("ScalarValue", u32::from(other))),
        })
    }
}

impl Encode for Row {
    fn encode_into<W: std::io::Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u32::<BigEndian>(self.values.len() as u32)?;
        for value in self.values.iter() {
            value.encode_into(writer)?;
        }
        Ok(())
    }
}

impl Decode for Row {
    fn decode_from<R: std::io::Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let count = reader.read_u32::<BigEndian>()?;
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            values.push(ScalarValue::decode_from(reader)?);
        }
        Ok(Self::new(values))
    }
}
