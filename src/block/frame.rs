// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Bit-exact on-disk log block framing (§6).

use super::header::{HeaderKey, HeaderMap};
use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::error::Error;
use crate::slice::Slice;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Fixed 7-byte marker at the start of every block frame.
pub const MAGIC: [u8; 7] = *b"#HUDI#!";

/// Frame format version this crate writes and reads.
pub const FRAME_VERSION: u32 = 1;

/// The `kind` discriminant of a block frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BlockKind {
    /// Row-producing data block.
    Data,
    /// Deletion block.
    Delete,
    /// In-band control block (currently only `ROLLBACK`).
    Command,
    /// Explicit on-disk marker for a block that is corrupt by construction,
    /// used by corruption-injection tests; never produced by a healthy writer.
    Corrupt,
    /// Change-data-capture block. Recognized so a CDC body is never
    /// misclassified as corrupt, but dropped unconditionally by the log
    /// scanner (snapshot reads do not emit change events).
    Cdc,
}

impl BlockKind {
    const fn to_u32(self) -> u32 {
        match self {
            Self::Data => 0,
            Self::Delete => 1,
            Self::Command => 2,
            Self::Corrupt => 3,
            Self::Cdc => 4,
        }
    }

    fn from_u32(value: u32) -> Result<Self, DecodeError> {
        Ok(match value {
            0 => Self::Data,
            1 => Self::Delete,
            2 => Self::Command,
            3 => Self::Corrupt,
            4 => Self::Cdc,
            other => return Err(DecodeError::InvalidTag("BlockKind", other)),
        })
    }
}

/// Subtype of a command block. `ROLLBACK` is the only one the reader acts
/// on; any other value is accepted but has no effect on the effective
/// stream (forward-compatible with future command subtypes).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CommandSubtype {
    /// Invalidate all earlier blocks of `TARGET_INSTANT_TIME`.
    Rollback,
    /// Unrecognized subtype string, carried through unacted-upon.
    Other(String),
}

impl CommandSubtype {
    fn parse(raw: &str) -> Self {
        if raw == "ROLLBACK" {
            Self::Rollback
        } else {
            Self::Other(raw.to_owned())
        }
    }
}

/// A single entry of a delete block's body: `(key, partition, ordering_wrapper_tag, ordering_bytes)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeleteEntry {
    /// Record key being deleted.
    pub key: Slice,
    /// Partition path of the record.
    pub partition: Slice,
    /// Tag identifying how `ordering_bytes` should be interpreted
    /// (mirrors [`crate::ordering::OrderingValue`]'s variants).
    pub ordering_wrapper_tag: u32,
    /// Raw ordering value bytes, interpreted per `ordering_wrapper_tag`.
    pub ordering_bytes: Slice,
}

/// Decoded structure of a data block's body, prior to the codec decoding
/// the raw record bytes into rows (§6, "Data-block body prefix").
#[derive(Clone, Debug)]
pub struct DataBlockBody {
    /// Which [`crate::block::codec::CodecTag`] the records are encoded with.
    pub codec_tag: u32,
    /// Name of the record-key field within the decoded rows.
    pub key_field: Slice,
    /// Compression applied to `records` (0 = none; see `CompressionType`).
    pub compression: u8,
    /// Number of records in `records`.
    pub record_count: u64,
    /// Raw, possibly-compressed record bytes. Decoded lazily by a
    /// [`crate::block::codec::BlockBodyCodec`] against the block's `SCHEMA`.
    pub records: Slice,
}

impl Decode for DataBlockBody {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let codec_tag = reader.read_u32::<BigEndian>()?;

        let key_field_len = reader.read_u32::<BigEndian>()?;
        let mut key_field = vec![0u8; key_field_len as usize];
        reader.read_exact(&mut key_field)?;

        let compression = reader.read_u8()?;
        let record_count = reader.read_u64::<BigEndian>()?;

        let mut records = Vec::new();
        reader.read_to_end(&mut records)?;

        Ok(Self {
            codec_tag,
            key_field: key_field.into(),
            compression,
            record_count,
            records: records.into(),
        })
    }
}

impl Encode for DataBlockBody {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u32::<BigEndian>(self.codec_tag)?;
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u32::<BigEndian>(self.key_field.len() as u32)?;
        writer.write_all(&self.key_field)?;
        writer.write_u8(self.compression)?;
        writer.write_u64::<BigEndian>(self.record_count)?;
        writer.write_all(&self.records)?;
        Ok(())
    }
}

/// Decoded structure of a delete block's body.
#[derive(Clone, Debug, Default)]
pub struct DeleteBlockBody {
    /// The deletions carried by this block.
    pub entries: Vec<DeleteEntry>,
}

impl Decode for DeleteBlockBody {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let count = reader.read_u32::<BigEndian>()?;
        let mut entries = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let key_len = reader.read_u32::<BigEndian>()?;
            let mut key = vec![0u8; key_len as usize];
            reader.read_exact(&mut key)?;

            let partition_len = reader.read_u32::<BigEndian>()?;
            let mut partition = vec![0u8; partition_len as usize];
            reader.read_exact(&mut partition)?;

            let ordering_wrapper_tag = reader.read_u32::<BigEndian>()?;

            let ordering_len = reader.read_u32::<BigEndian>()?;
            let mut ordering_bytes = vec![0u8; ordering_len as usize];
            reader.read_exact(&mut ordering_bytes)?;

            entries.push(DeleteEntry {
                key: key.into(),
                partition: partition.into(),
                ordering_wrapper_tag,
                ordering_bytes: ordering_bytes.into(),
            });
        }

        Ok(Self { entries })
    }
}

impl Encode for DeleteBlockBody {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u32::<BigEndian>(self.entries.len() as u32)?;

        for entry in &self.entries {
            #[allow(clippy::cast_possible_truncation)]
            writer.write_u32::<BigEndian>(entry.key.len() as u32)?;
            writer.write_all(&entry.key)?;
            #[allow(clippy::cast_possible_truncation)]
            writer.write_u32::<BigEndian>(entry.partition.len() as u32)?;
            writer.write_all(&entry.partition)?;
            writer.write_u32::<BigEndian>(entry.ordering_wrapper_tag)?;
            #[allow(clippy::cast_possible_truncation)]
            writer.write_u32::<BigEndian>(entry.ordering_bytes.len() as u32)?;
            writer.write_all(&entry.ordering_bytes)?;
        }

        Ok(())
    }
}

/// A fully-framed, header-decoded log block.
///
/// Matches the "tagged variant, dispatch by match" redesign: there is no
/// base `Block` type with virtual `decode`/`apply` methods, just this enum.
#[derive(Clone, Debug)]
pub enum LogBlock {
    /// Row-producing block.
    Data {
        /// Header map (`INSTANT_TIME`, `SCHEMA`, ...).
        header: HeaderMap,
        /// Decoded body prefix plus raw record bytes.
        body: DataBlockBody,
        /// Footer map.
        footer: HeaderMap,
    },
    /// Deletion block.
    Delete {
        /// Header map.
        header: HeaderMap,
        /// Decoded deletions.
        body: DeleteBlockBody,
        /// Footer map.
        footer: HeaderMap,
    },
    /// Control block.
    Command {
        /// Header map.
        header: HeaderMap,
        /// Parsed subtype (from `COMMAND_BLOCK_TYPE`).
        subtype: CommandSubtype,
        /// Footer map.
        footer: HeaderMap,
    },
    /// Change-data-capture block; carried only so the scanner can
    /// acknowledge and discard it instead of treating it as corrupt.
    Cdc {
        /// Header map.
        header: HeaderMap,
        /// Footer map.
        footer: HeaderMap,
    },
}

impl LogBlock {
    /// Returns this block's header map.
    #[must_use]
    pub fn header(&self) -> &HeaderMap {
        match self {
            Self::Data { header, .. }
            | Self::Delete { header, .. }
            | Self::Command { header, .. }
            | Self::Cdc { header, .. } => header,
        }
    }

    /// Returns the `INSTANT_TIME` header value, if present and valid UTF-8.
    #[must_use]
    pub fn instant_time(&self) -> Option<&str> {
        self.header().get_str(HeaderKey::InstantTime)
    }

    /// Returns `(target_instant, subtype)` for a `Command` block.
    #[must_use]
    pub fn as_command_target(&self) -> Option<(&str, &CommandSubtype)> {
        match self {
            Self::Command {
                header, subtype, ..
            } => header
                .get_str(HeaderKey::TargetInstantTime)
                .map(|t| (t, subtype)),
            _ => None,
        }
    }
}

/// Reads one block starting at `offset`, returning the block and the offset
/// of the next one.
///
/// Per §6: a magic mismatch or a length field that would read past `buf`'s
/// end is reported as [`Error::CorruptBlock`] rather than any lower-level
/// decode error, so the log scanner can uniformly skip and continue.
pub fn read_next(buf: &[u8], offset: u64, log_file: &str) -> crate::Result<(LogBlock, u64)> {
    let start = offset as usize;

    let block = (|| -> std::result::Result<(LogBlock, usize), DecodeError> {
        let mut cursor = std::io::Cursor::new(buf.get(start..).ok_or(DecodeError::LengthOutOfBounds)?);

        let mut magic = [0u8; MAGIC.len()];
        cursor.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(DecodeError::InvalidMagic);
        }

        let _version = cursor.read_u32::<BigEndian>()?;
        let kind = BlockKind::from_u32(cursor.read_u32::<BigEndian>()?)?;
        let header = HeaderMap::decode_from(&mut cursor)?;
        let body_len = cursor.read_u64::<BigEndian>()?;

        let mut body_bytes = vec![0u8; body_len as usize];
        cursor.read_exact(&mut body_bytes)?;

        let footer = HeaderMap::decode_from(&mut cursor)?;

        let block = match kind {
            BlockKind::Data => LogBlock::Data {
                header,
                body: DataBlockBody::decode_from(&mut std::io::Cursor::new(body_bytes))?,
                footer,
            },
            BlockKind::Delete => LogBlock::Delete {
                header,
                body: DeleteBlockBody::decode_from(&mut std::io::Cursor::new(body_bytes))?,
                footer,
            },
            BlockKind::Command => {
                let subtype = header
                    .get_str(HeaderKey::CommandBlockType)
                    .map(CommandSubtype::parse)
                    .unwrap_or_else(|| CommandSubtype::Other(String::new()));
                LogBlock::Command {
                    header,
                    subtype,
                    footer,
                }
            }
            BlockKind::Cdc => LogBlock::Cdc { header, footer },
            BlockKind::Corrupt => return Err(DecodeError::InvalidMagic),
        };

        let consumed = cursor.position() as usize;
        Ok((block, consumed))
    })();

    match block {
        Ok((block, consumed)) => Ok((block, offset + consumed as u64)),
        Err(_) => Err(Error::CorruptBlock {
            log_file: log_file.to_owned(),
            offset,
        }),
    }
}

/// Serializes a fully-formed block back into its bit-exact frame bytes.
/// Used by tests to construct fixture log files.
pub fn write_block<W: Write>(writer: &mut W, block: &LogBlock) -> Result<(), EncodeError> {
    writer.write_all(&MAGIC)?;
    writer.write_u32::<BigEndian>(FRAME_VERSION)?;

    let (kind, header, footer) = match block {
        LogBlock::Data { header, footer, .. } => (BlockKind::Data, header, footer),
        LogBlock::Delete { header, footer, .. } => (BlockKind::Delete, header, footer),
        LogBlock::Command { header, footer, .. } => (BlockKind::Command, header, footer),
        LogBlock::Cdc { header, footer } => (BlockKind::Cdc, header, footer),
    };

    writer.write_u32::<BigEndian>(kind.to_u32())?;
    header.encode_into(writer)?;

    let mut body_bytes = Vec::new();
    match block {
        LogBlock::Data { body, .. } => body.encode_into(&mut body_bytes)?,
        LogBlock::Delete { body, .. } => body.encode_into(&mut body_bytes)?,
        LogBlock::Command { .. } | LogBlock::Cdc { .. } => {}
    }

    writer.write_u64::<BigEndian>(body_bytes.len() as u64)?;
    writer.write_all(&body_bytes)?;
    footer.encode_into(writer)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::header::HeaderKey;

    fn data_block(instant: &str) -> LogBlock {
        LogBlock::Data {
            header: HeaderMap::new().with(HeaderKey::InstantTime, instant.as_bytes().to_vec()),
            body: DataBlockBody {
                codec_tag: 0,
                key_field: Slice::from("id"),
                compression: 0,
                record_count: 0,
                records: Slice::empty(),
            },
            footer: HeaderMap::new(),
        }
    }

    #[test]
    fn roundtrips_a_data_block() {
        let block = data_block("101");
        let mut buf = Vec::new();
        write_block(&mut buf, &block).unwrap();

        let (decoded, next) = read_next(&buf, 0, "L0").unwrap();
        assert_eq!(next, buf.len() as u64);
        assert_eq!(decoded.instant_time(), Some("101"));
    }

    #[test]
    fn magic_mismatch_is_corrupt_block() {
        let mut buf = Vec::new();
        write_block(&mut buf, &data_block("101")).unwrap();
        buf[0] = b'X';

        let err = read_next(&buf, 0, "L0").unwrap_err();
        assert!(matches!(
            err,
            Error::CorruptBlock {
                offset: 0,
                ..
            }
        ));
    }

    #[test]
    fn command_block_carries_rollback_target() {
        let header = HeaderMap::new()
            .with(HeaderKey::InstantTime, b"102".to_vec())
            .with(HeaderKey::TargetInstantTime, b"101".to_vec())
            .with(HeaderKey::CommandBlockType, b"ROLLBACK".to_vec());

        let block = LogBlock::Command {
            header,
            subtype: CommandSubtype::Rollback,
            footer: HeaderMap::new(),
        };

        let (target, subtype) = block.as_command_target().unwrap();
        assert_eq!(target, "101");
        assert_eq!(*subtype, CommandSubtype::Rollback);
    }
}
