// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The file-group reader: wires the block codec, log scanner, record
//! buffer, base-file reader, bootstrap merger and merge driver into the
//! `CREATED → INIT → SCANNING → MERGING → EXHAUSTED|FAILED|CANCELLED`
//! pull iterator of §4.7.

use crate::base_file::{read_required, BaseFileReader, InMemoryBaseFileReader};
use crate::block::codec::{decompress, CodecTag};
use crate::bootstrap::{BootstrapMerger, BootstrapMode};
use crate::buffer::RecordBuffer;
use crate::config::{MergeMode, ReaderConfig};
use crate::error::{Error, Result};
use crate::file_group::FileSlice;
use crate::instant::Instant;
use crate::log_scanner::{EffectivePayload, LogScanner};
use crate::merge_driver::{self, row_key};
use crate::merge_rule::{MergeRule, Merger};
use crate::ordering::OrderingValue;
use crate::record::{LogicalRecord, RecordKey, RecordState};
use crate::row::Row;
use crate::schema::{Schema, SchemaHandler};
use crate::slice::Slice;
use std::sync::Arc;

/// State of a [`FileGroupReader`] (§4.7).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReaderState {
    /// Constructed, nothing read yet.
    Created,
    /// `required_schema` computed.
    Init,
    /// Log files scanned and folded into a [`RecordBuffer`].
    Scanning,
    /// Merged rows are being emitted.
    Merging,
    /// Every row has been emitted.
    Exhausted,
    /// A fatal error was returned from `advance()`; no further rows follow.
    Failed,
    /// `close()` was called before exhaustion.
    Cancelled,
}

/// Adapts an `Arc<dyn Merger>` so the same stateless merger can back both
/// the record buffer's fold and the merge driver's base/buffer resolution
/// without requiring `Merger` itself to be `Clone`.
struct SharedMerger(Arc<dyn Merger>);

impl Merger for SharedMerger {
    fn combine(&self, existing: &LogicalRecord, incoming: &LogicalRecord) -> LogicalRecord {
        self.0.combine(existing, incoming)
    }

    fn is_delete(&self, record: &LogicalRecord) -> bool {
        self.0.is_delete(record)
    }
}

/// Single-threaded, pull-based reader of one file-group slice (§5).
///
/// Drive it with [`FileGroupReader::advance`] or as an [`Iterator`]; call
/// [`FileGroupReader::close`] to release resources early. Every method is
/// synchronous: the storage and codec collaborators are assumed to already
/// hold their bytes in memory or behind a blocking read, matching the
/// "single logical iterator, pull-based" scheduling model of §5 without
/// requiring an async runtime in the core.
pub struct FileGroupReader {
    config: ReaderConfig,
    slice: FileSlice,
    base_reader: Option<Box<dyn BaseFileReader>>,
    bootstrap_data_reader: Option<Box<dyn BaseFileReader>>,
    bootstrap_mode: Option<BootstrapMode>,
    custom_merger: Option<Arc<dyn Merger>>,

    state: ReaderState,
    required_schema: Option<Schema>,
    buffer: Option<RecordBuffer>,
    output: Option<std::vec::IntoIter<Row>>,
}

impl FileGroupReader {
    /// Builds a reader for `slice` under `config`.
    ///
    /// `base_reader` is required whenever `slice.base_file` is `Some`
    /// (checked lazily, at the first `advance()`/`INIT` transition, not
    /// here). `bootstrap` supplies the external data-file reader and zip
    /// mode for a bootstrapped base file; leave it `None` for an ordinary
    /// (non-bootstrap) base file or a log-only slice. `custom_merger` is
    /// required when `config`'s [`MergeMode`] is [`MergeMode::Custom`] and
    /// ignored otherwise.
    #[must_use]
    pub fn new(
        config: ReaderConfig,
        slice: FileSlice,
        base_reader: Option<Box<dyn BaseFileReader>>,
        bootstrap: Option<(Box<dyn BaseFileReader>, BootstrapMode)>,
        custom_merger: Option<Arc<dyn Merger>>,
    ) -> Self {
        let (bootstrap_data_reader, bootstrap_mode) = match bootstrap {
            Some((reader, mode)) => (Some(reader), Some(mode)),
            None => (None, None),
        };

        Self {
            config,
            slice,
            base_reader,
            bootstrap_data_reader,
            bootstrap_mode,
            custom_merger,
            state: ReaderState::Created,
            required_schema: None,
            buffer: None,
            output: None,
        }
    }

    /// The reader's current state.
    #[must_use]
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Cooperatively cancels the read. Idempotent and valid from any state:
    /// releases the base-file/bootstrap readers and any buffered spill, and
    /// every subsequent `advance()` returns `None`.
    pub fn close(&mut self) {
        if matches!(
            self.state,
            ReaderState::Exhausted | ReaderState::Failed | ReaderState::Cancelled
        ) {
            return;
        }

        self.base_reader = None;
        self.bootstrap_data_reader = None;
        self.buffer = None;
        self.output = None;
        self.state = ReaderState::Cancelled;
    }

    /// Pulls the next merged row, driving the state machine forward as
    /// needed. Returns `None` at `EXHAUSTED`, `FAILED` or `CANCELLED`.
    pub fn advance(&mut self) -> Option<Result<Row>> {
        loop {
            match self.state {
                ReaderState::Created => match self.init() {
                    Ok(()) => self.state = ReaderState::Init,
                    Err(e) => {
                        self.state = ReaderState::Failed;
                        return Some(Err(e));
                    }
                },
                ReaderState::Init => match self.scan_and_fold() {
                    Ok(buffer) => {
                        self.buffer = Some(buffer);
                        self.state = ReaderState::Scanning;
                    }
                    Err(e) => {
                        self.state = ReaderState::Failed;
                        return Some(Err(e));
                    }
                },
                ReaderState::Scanning => match self.merge() {
                    Ok(rows) => {
                        self.output = Some(rows.into_iter());
                        self.state = ReaderState::Merging;
                    }
                    Err(e) => {
                        self.state = ReaderState::Failed;
                        return Some(Err(e));
                    }
                },
                ReaderState::Merging => {
                    let next = self.output.as_mut().and_then(Iterator::next);
                    return match next {
                        Some(row) => Some(Ok(row)),
                        None => {
                            self.state = ReaderState::Exhausted;
                            None
                        }
                    };
                }
                ReaderState::Exhausted | ReaderState::Failed | ReaderState::Cancelled => {
                    return None
                }
            }
        }
    }

    fn build_merge_rule(&self) -> MergeRule {
        match (self.config.merge_mode, &self.custom_merger) {
            (MergeMode::Custom, Some(merger)) => {
                MergeRule::Custom(Box::new(SharedMerger(Arc::clone(merger))))
            }
            (MergeMode::Custom, None) => MergeRule::OverwriteWithLatest,
            (MergeMode::OverwriteWithLatest, _) => MergeRule::OverwriteWithLatest,
            (MergeMode::EventTime, _) => MergeRule::EventTime,
        }
    }

    fn init(&mut self) -> Result<()> {
        if self.slice.base_file.is_some() && self.base_reader.is_none() {
            return Err(Error::MissingBaseFile);
        }

        // This crate is "not a schema registry" (§1 Non-goal): a log-only
        // slice has no on-disk schema of its own to widen-check against, so
        // the requested schema doubles as its own mandatory-column source —
        // `record_key_field`/`precombine_field` must already be present in
        // `requested_schema` for a log-only read.
        let data_schema = match (&self.base_reader, &self.bootstrap_data_reader) {
            (Some(base), Some(data)) => combined_schema(base.data_schema(), data.data_schema()),
            (Some(base), None) => base.data_schema().clone(),
            (None, _) => self.config.requested_schema.clone(),
        };

        let required = SchemaHandler::new(&data_schema).derive_required_schema(
            &self.config.requested_schema,
            &self.config.record_key_field,
            self.config.precombine_field.as_deref(),
            self.config.use_row_position,
        )?;

        self.required_schema = Some(required);
        Ok(())
    }

    fn scan_and_fold(&mut self) -> Result<RecordBuffer> {
        let required_schema = self
            .required_schema
            .clone()
            .expect("INIT populates required_schema before SCANNING runs");

        let mut scanner = LogScanner::new(self.config.storage.as_ref(), self.config.timeline.as_ref());
        if let Some(cutoff) = &self.config.query_instant {
            scanner = scanner.with_query_instant(cutoff.clone());
        }

        let effective = scanner.scan(&self.slice.log_files)?;
        let mut buffer = RecordBuffer::new(self.build_merge_rule(), self.config.max_memory_bytes);

        for (block_seq, block) in effective.into_iter().enumerate() {
            match block.payload {
                EffectivePayload::Data(body) => {
                    let log_file = block.instant.as_str();
                    let decompressed = decompress(body.compression, &body.records, log_file, 0)?;
                    let rows = self.config.codecs.decode(
                        CodecTag(body.codec_tag),
                        &decompressed,
                        &required_schema,
                        log_file,
                        0,
                    )?;

                    let key_field = std::str::from_utf8(&body.key_field)
                        .unwrap_or(&self.config.record_key_field);

                    for (row_seq, row) in rows.into_iter().enumerate() {
                        let key = row_key(
                            &row,
                            &required_schema,
                            key_field,
                            self.config.use_row_position,
                        );
                        let ordering = self.ordering_value_for(
                            &row,
                            &required_schema,
                            &block.instant,
                            block_seq as u64,
                            row_seq as u64,
                        );
                        buffer.fold(LogicalRecord::new(
                            key,
                            Slice::empty(),
                            RecordState::Present(row),
                            ordering,
                            block.instant.clone(),
                        ))?;
                    }
                }
                EffectivePayload::Delete(body) => {
                    for entry in body.entries {
                        let ordering =
                            OrderingValue::from_wrapper(entry.ordering_wrapper_tag, &entry.ordering_bytes)
                                .unwrap_or(OrderingValue::Null);

                        buffer.fold(LogicalRecord::new(
                            RecordKey::Key(entry.key),
                            entry.partition,
                            RecordState::Tombstone,
                            ordering,
                            block.instant.clone(),
                        ))?;
                    }
                }
            }
        }

        Ok(buffer)
    }

    fn ordering_value_for(
        &self,
        row: &Row,
        schema: &Schema,
        instant: &Instant,
        block_seq: u64,
        row_seq: u64,
    ) -> OrderingValue {
        match &self.config.precombine_field {
            Some(field) => match row.get_named(schema, field) {
                Some(value) => OrderingValue::from_scalar(value),
                None => OrderingValue::Fallback(instant.clone(), block_seq, row_seq),
            },
            None => OrderingValue::Fallback(instant.clone(), block_seq, row_seq),
        }
    }

    fn merge(&mut self) -> Result<Vec<Row>> {
        let required_schema = self
            .required_schema
            .clone()
            .expect("INIT populates required_schema before MERGING runs");
        let buffer = self
            .buffer
            .take()
            .expect("SCANNING populates the fold buffer before MERGING runs");

        let base_rows = match &self.base_reader {
            None => Vec::new(),
            Some(base) => match (&self.bootstrap_data_reader, self.bootstrap_mode) {
                (Some(data), Some(mode)) => {
                    let zipped = BootstrapMerger::new(mode).zip(
                        &base.read_rows()?,
                        base.data_schema(),
                        &data.read_rows()?,
                        data.data_schema(),
                    )?;
                    let combined = combined_schema(base.data_schema(), data.data_schema());
                    let synthetic = InMemoryBaseFileReader::new(combined, zipped);
                    read_required(&synthetic, &required_schema)?
                }
                _ => read_required(base.as_ref(), &required_schema)?,
            },
        };

        let base_instant = self
            .slice
            .base_file
            .as_ref()
            .map(|b| b.base_instant.clone())
            .unwrap_or_else(|| Instant::new(""));

        merge_driver::merge(
            base_rows,
            &required_schema,
            &self.config.record_key_field,
            self.config.precombine_field.as_deref(),
            self.config.use_row_position,
            &base_instant,
            &self.build_merge_rule(),
            buffer,
        )
    }
}

impl Iterator for FileGroupReader {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}

fn combined_schema(meta: &Schema, data: &Schema) -> Schema {
    Schema::new(
        meta.fields()
            .iter()
            .cloned()
            .chain(data.fields().iter().cloned())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_file::InMemoryBaseFileReader;
    use crate::block::codec::{BlockBodyCodec, CodecRegistry};
    use crate::block::frame::{self, DataBlockBody, LogBlock};
    use crate::block::header::{HeaderKey, HeaderMap};
    use crate::instant::{ActionType, StaticTimeline};
    use crate::row::ScalarValue;
    use crate::schema::{DataType, StructField};
    use crate::storage::MemoryStorage;

    fn schema() -> Schema {
        Schema::new(vec![
            StructField::new("id", DataType::String, false),
            StructField::new("v", DataType::Int64, false),
            StructField::new("ts", DataType::Int64, false),
        ])
    }

    struct TaggedRowsCodec(Vec<Row>);

    impl BlockBodyCodec for TaggedRowsCodec {
        fn decode(&self, _bytes: &[u8], _schema: &Schema) -> Result<Vec<Row>> {
            Ok(self.0.clone())
        }
    }

    fn write_data_block(buf: &mut Vec<u8>, instant: &str, rows: Vec<Row>, codec_tag: u32) {
        let block = LogBlock::Data {
            header: HeaderMap::new().with(HeaderKey::InstantTime, instant.as_bytes().to_vec()),
            body: DataBlockBody {
                codec_tag,
                key_field: Slice::from("id"),
                compression: 0,
                record_count: rows.len() as u64,
                records: Slice::empty(),
            },
            footer: HeaderMap::new(),
        };
        let _ = rows;
        frame::write_block(buf, &block).unwrap();
    }

    fn row(id: &str, v: i64, ts: i64) -> Row {
        Row::new(vec![
            ScalarValue::String(id.into()),
            ScalarValue::Int64(v),
            ScalarValue::Int64(ts),
        ])
    }

    #[test]
    fn log_only_upsert_merges_across_two_log_files() {
        let schema = schema();

        let mut l0 = Vec::new();
        write_data_block(&mut l0, "101", vec![row("id1", 10, 1), row("id2", 20, 1)], 0);
        let mut l1 = Vec::new();
        write_data_block(&mut l1, "102", vec![row("id1", 11, 2)], 1);

        let storage = MemoryStorage::new().with_file("L0", l0).with_file("L1", l1);
        let timeline = StaticTimeline::new()
            .with_completed("101", ActionType::DeltaCommit)
            .with_completed("102", ActionType::DeltaCommit);

        let codecs = Arc::new(
            CodecRegistry::new()
                .with_codec(CodecTag(0), Box::new(TaggedRowsCodec(vec![row("id1", 10, 1), row("id2", 20, 1)])))
                .with_codec(CodecTag(1), Box::new(TaggedRowsCodec(vec![row("id1", 11, 2)]))),
        );

        let config = ReaderConfig::new(Arc::new(storage), Arc::new(timeline), codecs, "id", schema.clone())
            .merge_mode(MergeMode::EventTime)
            .precombine_field("ts");

        let slice = FileSlice::new()
            .with_log_file(crate::file_group::LogFile::new("L0", "fg1", "100", 1, "t1"))
            .with_log_file(crate::file_group::LogFile::new("L1", "fg1", "100", 2, "t2"));

        let mut reader = FileGroupReader::new(config, slice, None, None, None);

        let mut rows: Vec<Row> = Vec::new();
        while let Some(result) = reader.advance() {
            rows.push(result.unwrap());
        }

        assert_eq!(reader.state(), ReaderState::Exhausted);
        assert_eq!(rows.len(), 2);

        let id1 = rows.iter().find(|r| r.get(0) == Some(&ScalarValue::String("id1".into()))).unwrap();
        assert_eq!(id1.get(1), Some(&ScalarValue::Int64(11)));
    }

    #[test]
    fn missing_base_file_fails_the_slice() {
        let schema = schema();
        let storage = MemoryStorage::new();
        let timeline = StaticTimeline::new();
        let codecs = Arc::new(CodecRegistry::new());

        let config = ReaderConfig::new(Arc::new(storage), Arc::new(timeline), codecs, "id", schema)
            .precombine_field("ts");

        let slice = FileSlice::new().with_base_file(crate::file_group::BaseFile::new("base.parquet", "100"));
        let mut reader = FileGroupReader::new(config, slice, None, None, None);

        let err = reader.advance().unwrap().unwrap_err();
        assert!(matches!(err, Error::MissingBaseFile));
        assert_eq!(reader.state(), ReaderState::Failed);
        assert!(reader.advance().is_none());
    }

    #[test]
    fn close_is_idempotent_and_stops_emission() {
        let schema = schema();
        let storage = MemoryStorage::new();
        let timeline = StaticTimeline::new();
        let codecs = Arc::new(CodecRegistry::new());

        let config = ReaderConfig::new(Arc::new(storage), Arc::new(timeline), codecs, "id", schema)
            .precombine_field("ts");

        let slice = FileSlice::new();
        let mut reader = FileGroupReader::new(config, slice, None, None, None);

        reader.close();
        reader.close();
        assert_eq!(reader.state(), ReaderState::Cancelled);
        assert!(reader.advance().is_none());
    }

    #[test]
    fn tombstone_suppresses_base_row_end_to_end() {
        let schema = schema();

        let mut l0 = Vec::new();
        {
            let header = HeaderMap::new().with(HeaderKey::InstantTime, b"101".to_vec());
            let block = LogBlock::Delete {
                header,
                body: crate::block::frame::DeleteBlockBody {
                    entries: vec![crate::block::frame::DeleteEntry {
                        key: Slice::from("id1"),
                        partition: Slice::empty(),
                        ordering_wrapper_tag: 1,
                        ordering_bytes: OrderingValue::Integer(2).encode_into_vec()[1..].to_vec().into(),
                    }],
                },
                footer: HeaderMap::new(),
            };
            frame::write_block(&mut l0, &block).unwrap();
        }

        let storage = MemoryStorage::new()
            .with_file("L0", l0)
            .with_file("base.parquet", Vec::new());
        let timeline = StaticTimeline::new().with_completed("101", ActionType::DeltaCommit);
        let codecs = Arc::new(CodecRegistry::new());

        let config = ReaderConfig::new(Arc::new(storage), Arc::new(timeline), codecs, "id", schema.clone())
            .merge_mode(MergeMode::EventTime)
            .precombine_field("ts");

        let base_reader = InMemoryBaseFileReader::new(schema, vec![row("id1", 10, 1)]);

        let slice = FileSlice::new()
            .with_base_file(crate::file_group::BaseFile::new("base.parquet", "100"))
            .with_log_file(crate::file_group::LogFile::new("L0", "fg1", "100", 1, "t1"));

        let mut reader = FileGroupReader::new(
            config,
            slice,
            Some(Box::new(base_reader)),
            None,
            None,
        );

        let mut rows: Vec<Row> = Vec::new();
        while let Some(result) = reader.advance() {
            rows.push(result.unwrap());
        }

        assert!(rows.is_empty());
    }
}
