// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! An engine-agnostic Merge-on-Read file-group reader for Apache Hudi.
//!
//! ##### NOTE
//!
//! > This crate reads a single file group's base file and log files into a
//! > merged row stream. It does not sync a metastore, plan a query across
//! > file groups, or write tables — see the module docs below for the exact
//! > boundary.
//!
//! ##### About
//!
//! A Hudi *file group* is a base (columnar) file plus an ordered sequence of
//! append-only log files recording inserts, updates and deletes against it.
//! Reading a file group means scanning its log files into a totally ordered
//! block stream, folding that stream into a keyed view with tombstone-aware
//! merge semantics, and driving a final merge against the base file's rows.
//!
//! This crate owns exactly that: block framing and codec dispatch
//! ([`block`]), log scanning with rollback and visibility filtering
//! ([`log_scanner`]), the keyed fold buffer with disk spill
//! ([`buffer`]), base-file reading and schema widening ([`base_file`],
//! [`schema`]), bootstrap skeleton/data zipping ([`bootstrap`]), and the
//! pull-based reader state machine that ties them together ([`reader`]).
//! Storage I/O, the timeline oracle and the on-disk columnar codecs
//! themselves are collaborator traits the embedder supplies.
//!
//! # Example usage
//!
//! ```
//! use filegroup_reader::{
//!     BaseFile, CodecRegistry, DataType, FileGroupReader, FileSlice, MemoryStorage,
//!     ReaderConfig, Schema, StaticTimeline, StructField,
//! };
//! use std::sync::Arc;
//!
//! let schema = Schema::new(vec![
//!     StructField::new("id", DataType::String, false),
//!     StructField::new("ts", DataType::Int64, false),
//! ]);
//!
//! let config = ReaderConfig::new(
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(StaticTimeline::new()),
//!     Arc::new(CodecRegistry::new()),
//!     "id",
//!     schema,
//! )
//! .precombine_field("ts");
//!
//! let slice = FileSlice::new();
//! let mut reader = FileGroupReader::new(config, slice, None, None, None);
//!
//! while let Some(row) = reader.advance() {
//!     let _row = row?;
//! }
//! #
//! # Ok::<(), filegroup_reader::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]

pub mod base_file;
pub mod block;
pub mod bootstrap;
pub mod buffer;
pub mod checksum;

#[doc(hidden)]
pub mod coding;

mod config;
mod error;
pub mod file_group;
pub mod instant;
pub mod log_scanner;
pub mod merge_driver;
pub mod merge_rule;
pub mod ordering;
pub mod reader;
pub mod record;
pub mod row;
pub mod schema;
mod slice;
pub mod spill;
pub mod storage;

pub use base_file::{read_required, BaseFileReader, InMemoryBaseFileReader};
pub use block::codec::{decompress, BlockBodyCodec, CodecRegistry, CodecTag};
pub use block::frame::{
    BlockKind, CommandSubtype, DataBlockBody, DeleteBlockBody, DeleteEntry, LogBlock,
};
pub use block::header::{HeaderKey, HeaderMap};
pub use bootstrap::{BootstrapMerger, BootstrapMode};
pub use buffer::RecordBuffer;
pub use checksum::Checksum;
pub use config::{MergeMode, ReaderConfig};
pub use error::{Error, Result};
pub use file_group::{BaseFile, FileSlice, LogFile};
pub use instant::{ActionType, Instant, StaticTimeline, TimelineOracle};
pub use log_scanner::{EffectiveBlock, EffectivePayload, LogScanner};
pub use merge_rule::{MergeRule, Merger};
pub use ordering::OrderingValue;
pub use reader::{FileGroupReader, ReaderState};
pub use record::{LogicalRecord, RecordKey, RecordState};
pub use row::{Row, ScalarValue};
pub use schema::{DataType, Schema, SchemaHandler, StructField, ROW_INDEX_COLUMN};
pub use slice::Slice;
pub use spill::SpillStore;
pub use storage::{MemoryStorage, ReadHandle, Storage};
