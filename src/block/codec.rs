// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Block-body codec registry (§6, collaborator 3).
//!
//! The reader never depends on a concrete columnar format crate. Instead it
//! asks a [`CodecRegistry`] for the [`BlockBodyCodec`] registered under a
//! block's `codec_tag` and has it decode raw record bytes into
//! [`crate::row::Row`]s against the block's schema. This keeps Avro,
//! Parquet and HFile support pluggable and out of the core (§1 Non-goals).

use crate::error::{Error, Result};
use crate::row::Row;
use crate::schema::Schema;
use crate::slice::Slice;
use rustc_hash::FxHashMap;

/// Well-known codec tags carried in [`crate::block::frame::DataBlockBody::codec_tag`].
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct CodecTag(pub u32);

impl CodecTag {
    /// Avro-encoded records.
    pub const AVRO_DATA: Self = Self(0);
    /// Parquet-encoded records.
    pub const PARQUET_DATA: Self = Self(1);
    /// HFile-encoded records.
    pub const HFILE_DATA: Self = Self(2);
    /// Change-data-capture records (never decoded for snapshot reads).
    pub const CDC_DATA: Self = Self(3);
    /// Delete-block body (handled structurally, not through a registered codec).
    pub const DELETE: Self = Self(4);
    /// Command-block body (handled structurally, not through a registered codec).
    pub const COMMAND: Self = Self(5);
}

/// Decodes a data block's raw record bytes into rows.
///
/// Implementations are pure: given the same bytes and schema they must
/// produce the same rows, since the merge driver may call this lazily and
/// more than once if [`crate::config::ReaderConfig::lazy_block_read`] is set.
pub trait BlockBodyCodec: Send + Sync {
    /// Decodes `bytes` (already decompressed) into rows matching `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnreadableLogBlock`]-shaped errors via the caller;
    /// codecs themselves return any [`Error`] variant appropriate to the
    /// failure (most commonly [`Error::SchemaMismatch`] for a malformed body).
    fn decode(&self, bytes: &[u8], schema: &Schema) -> Result<Vec<Row>>;
}

/// Maps [`CodecTag`]s to their [`BlockBodyCodec`] implementation.
///
/// Dispatch is a single hash lookup followed by a direct call — no runtime
/// reflection or plugin loading, per the "compile-time dispatch" redesign
/// flag: codecs are registered once, by the embedder, at construction time.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: FxHashMap<u32, Box<dyn BlockBodyCodec>>,
}

impl CodecRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the codec for `tag`.
    #[must_use]
    pub fn with_codec(mut self, tag: CodecTag, codec: Box<dyn BlockBodyCodec>) -> Self {
        self.codecs.insert(tag.0, codec);
        self
    }

    /// Decodes `bytes` using the codec registered for `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnreadableLogBlock`] if no codec is registered for
    /// `tag`, per §4.5's "unknown block kind ... fail slice read ... do not
    /// silently skip" rule applied to unresolvable codecs.
    pub fn decode(
        &self,
        tag: CodecTag,
        bytes: &[u8],
        schema: &Schema,
        log_file: &str,
        offset: u64,
    ) -> Result<Vec<Row>> {
        let codec = self.codecs.get(&tag.0).ok_or_else(|| Error::UnreadableLogBlock {
            log_file: log_file.to_owned(),
            offset,
            reason: format!("no codec registered for tag {}", tag.0),
        })?;

        codec.decode(bytes, schema)
    }
}

/// Decompresses a data block's `records` bytes per the body prefix's
/// `compression` byte (0 = none, 1 = lz4).
///
/// # Errors
///
/// Returns [`Error::UnreadableLogBlock`] if `compression` names a codec not
/// compiled into this build (e.g. `lz4` without the `lz4` feature).
pub fn decompress(compression: u8, bytes: &Slice, log_file: &str, offset: u64) -> Result<Vec<u8>> {
    match compression {
        0 => Ok(bytes.to_vec()),

        #[cfg(feature = "lz4")]
        1 => lz4_flex::decompress_size_prepended(bytes).map_err(|e| Error::UnreadableLogBlock {
            log_file: log_file.to_owned(),
            offset,
            reason: format!("lz4 decompress failed: {e}"),
        }),

        other => Err(Error::UnreadableLogBlock {
            log_file: log_file.to_owned(),
            offset,
            reason: format!("unsupported compression tag {other}"),
        }),
    }
}
