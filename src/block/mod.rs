// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Log block framing, header/footer maps and body codecs (§6).

pub mod codec;
pub mod frame;
pub mod header;

use self_cell::self_cell;

use crate::error::Result;
use crate::row::Row;

type RowIter<'a> = std::slice::Iter<'a, Row>;

self_cell!(
    /// A data block's decoded rows, iterated without copying them back out
    /// of the owning `Vec` (mirrors the teacher's `OwnedIndexBlockIter`).
    ///
    /// Exists so [`crate::config::ReaderConfig::lazy_block_read`] can defer
    /// the (possibly decompressing) codec call until the merge driver
    /// actually needs this block's rows, rather than at scan time.
    pub struct OwnedDataBlockIter {
        owner: Vec<Row>,

        #[covariant]
        dependent: RowIter,
    }
);

impl OwnedDataBlockIter {
    /// Decodes `bytes` eagerly and wraps the result for iteration.
    ///
    /// # Errors
    ///
    /// Propagates whatever [`crate::block::codec::BlockBodyCodec::decode`] returns.
    pub fn decode(
        registry: &codec::CodecRegistry,
        tag: codec::CodecTag,
        bytes: &[u8],
        schema: &crate::schema::Schema,
        log_file: &str,
        offset: u64,
    ) -> Result<Self> {
        let rows = registry.decode(tag, bytes, schema, log_file, offset)?;
        Ok(Self::new(rows, |rows| rows.iter()))
    }
}

impl Iterator for OwnedDataBlockIter {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        self.with_dependent_mut(|_, iter| iter.next().cloned())
    }
}
