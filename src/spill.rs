// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Scoped, tempfile-backed overflow store for [`crate::buffer::RecordBuffer`].
//!
//! A spill store owns exactly one temp file for the lifetime of the reader
//! that created it, and releases it on every exit path (normal exhaustion,
//! error, or cancellation) by relying on `tempfile`'s drop-to-delete
//! semantics — there is no explicit cleanup call to forget.

use crate::coding::{Decode, Encode};
use crate::error::{Error, Result};
use crate::record::LogicalRecord;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use rustc_hash::FxHashMap;
use std::io::{Read, Seek, SeekFrom, Write};

/// `(offset, length)` of one spilled record within the backing file.
#[derive(Copy, Clone, Debug)]
struct SpillLocation {
    offset: u64,
    len: u32,
}

/// An append-only, keyed overflow area for [`LogicalRecord`]s evicted from
/// an in-memory [`crate::buffer::RecordBuffer`] once it crosses
/// `max_memory_bytes`.
///
/// Only the index (key to file location) is kept in memory; record bodies
/// live entirely on disk until read back.
pub struct SpillStore {
    file: tempfile::NamedTempFile,
    index: FxHashMap<Vec<u8>, SpillLocation>,
    write_cursor: u64,
}

impl SpillStore {
    /// Creates a new spill store backed by a fresh temp file in `dir`
    /// (or the system temp directory if `dir` is `None`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the temp file cannot be created.
    pub fn new(dir: Option<&std::path::Path>) -> Result<Self> {
        let file = match dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir),
            None => tempfile::NamedTempFile::new(),
        }
        .map_err(Error::Io)?;

        Ok(Self {
            file,
            index: FxHashMap::default(),
            write_cursor: 0,
        })
    }

    /// Writes `record` under `key_bytes`, overwriting any prior spilled
    /// value for the same key by appending (the index always points at the
    /// latest write).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on write failure, [`Error::Encode`] if the
    /// record cannot be serialized.
    pub fn put(&mut self, key_bytes: Vec<u8>, record: &LogicalRecord) -> Result<()> {
        let bytes = record.encode_into_vec();
        #[allow(clippy::cast_possible_truncation)]
        let len = bytes.len() as u32;

        self.file.as_file_mut().seek(SeekFrom::Start(self.write_cursor))?;
        self.file.as_file_mut().write_u32::<BigEndian>(len)?;
        self.file.as_file_mut().write_all(&bytes)?;

        self.index.insert(
            key_bytes,
            SpillLocation {
                offset: self.write_cursor,
                len,
            },
        );
        self.write_cursor += 4 + u64::from(len);

        Ok(())
    }

    /// Reads back the record spilled under `key_bytes`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on read failure, [`Error::Decode`] if the
    /// stored bytes are malformed (should not happen for data this store
    /// wrote itself).
    pub fn get(&mut self, key_bytes: &[u8]) -> Result<Option<LogicalRecord>> {
        let Some(location) = self.index.get(key_bytes).copied() else {
            return Ok(None);
        };

        self.file.as_file_mut().seek(SeekFrom::Start(location.offset))?;
        let recorded_len = self.file.as_file_mut().read_u32::<BigEndian>()?;
        debug_assert_eq!(recorded_len, location.len);

        let mut buf = vec![0u8; location.len as usize];
        self.file.as_file_mut().read_exact(&mut buf)?;

        let record = LogicalRecord::decode_from(&mut std::io::Cursor::new(buf))?;
        Ok(Some(record))
    }

    /// Removes a key from the index without reclaiming its file bytes
    /// (the space is recovered only when the whole store is dropped).
    pub fn remove(&mut self, key_bytes: &[u8]) {
        self.index.remove(key_bytes);
    }

    /// Number of keys currently spilled.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// `true` if nothing has been spilled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Keys currently spilled, for draining back into the buffer.
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.index.keys().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instant::Instant;
    use crate::ordering::OrderingValue;
    use crate::record::{RecordKey, RecordState};
    use crate::row::{Row, ScalarValue};
    use crate::slice::Slice;

    #[test]
    fn spill_roundtrips_a_record() {
        let mut store = SpillStore::new(None).unwrap();
        let record = LogicalRecord::new(
            RecordKey::Key(Slice::from("k1")),
            Slice::from("p1"),
            RecordState::Present(Row::new(vec![ScalarValue::Int64(42)])),
            OrderingValue::Integer(1),
            Instant::new("100"),
        );

        store.put(b"k1".to_vec(), &record).unwrap();
        let back = store.get(b"k1").unwrap().unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn missing_key_returns_none() {
        let mut store = SpillStore::new(None).unwrap();
        assert!(store.get(b"missing").unwrap().is_none());
    }
}
