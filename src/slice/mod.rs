// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use byteview::ByteView;
use std::sync::Arc;

/// An immutable byte slice that can be cloned without additional heap allocation.
///
/// All bytes that cross the block-codec/storage boundary (record keys,
/// instants, header values, row payloads) are represented as `Slice` so that
/// the merge path never copies data it only needs to compare or re-emit.
///
/// There is no guarantee of any sort of alignment for zero-copy (de)serialization.
#[derive(Clone, Eq, Hash, Ord)]
pub struct Slice(ByteView);

impl Slice {
    /// Constructs a [`Slice`] from a byte slice.
    #[must_use]
    pub fn new(bytes: &[u8]) -> Self {
        Self(ByteView::from(bytes))
    }

    /// Returns an empty slice.
    #[must_use]
    pub fn empty() -> Self {
        Self(ByteView::new(&[]))
    }

    /// Returns a sub-slice sharing the same backing allocation.
    #[must_use]
    pub fn slice(&self, range: impl std::ops::RangeBounds<usize>) -> Self {
        Self(self.0.slice(range))
    }

    pub(crate) fn from_reader<R: std::io::Read>(
        reader: &mut R,
        len: usize,
    ) -> std::io::Result<Self> {
        ByteView::from_reader(reader, len).map(Self)
    }
}

impl std::fmt::Debug for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Ok(s) = std::str::from_utf8(&self.0) {
            write!(f, "{s:?}")
        } else {
            write!(f, "{:?}", &*self.0)
        }
    }
}

impl Default for Slice {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Slice {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Slice {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.0.cmp(&other.0))
    }
}

impl std::ops::Deref for Slice {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Slice {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Slice {
    fn from(value: &[u8]) -> Self {
        Self(ByteView::new(value))
    }
}

impl From<Vec<u8>> for Slice {
    fn from(value: Vec<u8>) -> Self {
        Self(ByteView::from(value))
    }
}

impl From<Arc<[u8]>> for Slice {
    fn from(value: Arc<[u8]>) -> Self {
        Self::from(&*value)
    }
}

impl From<&str> for Slice {
    fn from(value: &str) -> Self {
        Self::from(value.as_bytes())
    }
}

impl From<String> for Slice {
    fn from(value: String) -> Self {
        Self(ByteView::from(value.into_bytes()))
    }
}

impl<const N: usize> From<[u8; N]> for Slice {
    fn from(value: [u8; N]) -> Self {
        Self::from(value.as_slice())
    }
}

impl crate::coding::Encode for Slice {
    fn encode_into<W: std::io::Write>(&self, writer: &mut W) -> Result<(), crate::coding::EncodeError> {
        use byteorder::{BigEndian, WriteBytesExt};
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u32::<BigEndian>(self.len() as u32)?;
        writer.write_all(self)?;
        Ok(())
    }
}

impl crate::coding::Decode for Slice {
    fn decode_from<R: std::io::Read>(reader: &mut R) -> Result<Self, crate::coding::DecodeError> {
        use byteorder::{BigEndian, ReadBytesExt};
        let len = reader.read_u32::<BigEndian>()?;
        Ok(Self::from_reader(reader, len as usize)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_eq_and_slice_of() {
        let a = Slice::from("hello world");
        let b = a.slice(0..5);
        assert_eq!(&*b, b"hello");
        assert_eq!(a, Slice::from("hello world"));
    }

    #[test]
    fn slice_ordering_is_byte_lexicographic() {
        assert!(Slice::from("a") < Slice::from("b"));
        assert!(Slice::from("100") < Slice::from("20")); // byte-wise, not numeric
    }
}
