// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    coding::{DecodeError, EncodeError},
    checksum::Checksum,
    instant::Instant,
};

/// Errors that can occur while reading a file-group slice.
///
/// Only [`Error::CorruptBlock`] is recovered locally by the log scanner
/// (the block is skipped and scanning continues); every other variant
/// surfaces to the caller and fails the slice read. There are no implicit
/// partial results.
#[derive(Debug)]
pub enum Error {
    /// I/O error from the storage collaborator.
    Io(std::io::Error),

    /// Serialization failed.
    Encode(EncodeError),

    /// Deserialization failed.
    Decode(DecodeError),

    /// A block's checksum did not match; the block is skipped and the scan continues.
    CorruptBlock {
        /// Path of the log file the block was read from.
        log_file: String,
        /// Byte offset the corrupt block started at.
        offset: u64,
    },

    /// A block's `kind` is unknown, or its header's `SCHEMA` could not be
    /// parsed against `data_schema`. Fatal for the enclosing slice read.
    UnreadableLogBlock {
        /// Path of the log file the block was read from.
        log_file: String,
        /// Byte offset the block started at.
        offset: u64,
        /// Human-readable reason.
        reason: String,
    },

    /// The file slice expects a base file but none was supplied.
    MissingBaseFile,

    /// The bootstrap skeleton and external data streams could not be zipped:
    /// mismatched row counts (key mode) or non-terminating position skew
    /// (position mode).
    BootstrapDesync {
        /// Reason the zip failed.
        reason: String,
    },

    /// A column required for the merge (precombine field, record key, or
    /// `_row_index`) is absent from `data_schema`, or has an incompatible type.
    SchemaMismatch {
        /// Name of the offending column.
        column: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The custom merger signaled failure.
    MergerError(String),

    /// The storage or base-file collaborator raised an I/O error that is not
    /// a framing problem; the caller decides the retry policy.
    UnderlyingIoError(std::io::Error),

    /// Invalid or unparsable checksum (got, expected).
    InvalidChecksum {
        /// Checksum computed over the bytes actually read.
        got: Checksum,
        /// Checksum recorded in the frame header.
        expected: Checksum,
    },

    /// An instant referenced by a block is unknown to the timeline oracle.
    UnknownInstant(Instant),

    /// Cooperative cancellation via [`crate::reader::FileGroupReader::close`].
    /// Not logged as a failure.
    Cancelled,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Encode(e) => write!(f, "encode error: {e}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
            Self::CorruptBlock { log_file, offset } => {
                write!(f, "corrupt block in {log_file} at offset {offset}")
            }
            Self::UnreadableLogBlock {
                log_file,
                offset,
                reason,
            } => write!(
                f,
                "unreadable log block in {log_file} at offset {offset}: {reason}"
            ),
            Self::MissingBaseFile => write!(f, "file slice expects a base file but has none"),
            Self::BootstrapDesync { reason } => write!(f, "bootstrap desync: {reason}"),
            Self::SchemaMismatch { column, reason } => {
                write!(f, "schema mismatch on column {column:?}: {reason}")
            }
            Self::MergerError(reason) => write!(f, "custom merger failed: {reason}"),
            Self::UnderlyingIoError(e) => write!(f, "underlying I/O error: {e}"),
            Self::InvalidChecksum { got, expected } => {
                write!(f, "checksum mismatch: got {got}, expected {expected}")
            }
            Self::UnknownInstant(i) => write!(f, "unknown instant: {i:?}"),
            Self::Cancelled => write!(f, "reader was cancelled"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<EncodeError> for Error {
    fn from(value: EncodeError) -> Self {
        Self::Encode(value)
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
