// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Reader configuration (§6): "no CLI or env surface in the core", so
//! every option is a struct field set through a consuming builder.

use crate::block::codec::CodecRegistry;
use crate::instant::{Instant, TimelineOracle};
use crate::schema::Schema;
use crate::storage::Storage;
use std::sync::Arc;

/// Which [`MergeRule`](crate::merge_rule::MergeRule) shape to use.
///
/// Kept separate from `MergeRule` itself because `Custom` needs a boxed
/// trait object supplied at construction time, while this enum is a cheap,
/// `Copy`-able config knob callers can log and compare.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MergeMode {
    /// Last-arrival-wins.
    OverwriteWithLatest,
    /// Highest-precombine-value-wins.
    EventTime,
    /// User-supplied [`crate::merge_rule::Merger`].
    Custom,
}

/// Reader configuration. Construct with [`ReaderConfig::new`], then chain
/// the `with_*` setters, mirroring the teacher's `Config` builder.
pub struct ReaderConfig {
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) timeline: Arc<dyn TimelineOracle + Send + Sync>,
    pub(crate) codecs: Arc<CodecRegistry>,

    pub(crate) merge_mode: MergeMode,
    pub(crate) record_key_field: String,
    pub(crate) precombine_field: Option<String>,
    pub(crate) use_row_position: bool,
    pub(crate) max_memory_bytes: u64,
    pub(crate) lazy_block_read: bool,
    /// Reserved for a future incremental (non-snapshot) mode; has no effect
    /// on snapshot reads (§6).
    pub(crate) reverse_reader: bool,
    pub(crate) query_instant: Option<Instant>,
    pub(crate) requested_schema: Schema,
}

impl ReaderConfig {
    /// Creates a configuration with the mandatory collaborators and record
    /// key field; every other option defaults to the conservative choice
    /// (`OVERWRITE_WITH_LATEST`, no row position, unbounded memory, eager
    /// block reads).
    #[must_use]
    pub fn new(
        storage: Arc<dyn Storage>,
        timeline: Arc<dyn TimelineOracle + Send + Sync>,
        codecs: Arc<CodecRegistry>,
        record_key_field: impl Into<String>,
        requested_schema: Schema,
    ) -> Self {
        Self {
            storage,
            timeline,
            codecs,
            merge_mode: MergeMode::OverwriteWithLatest,
            record_key_field: record_key_field.into(),
            precombine_field: None,
            use_row_position: false,
            max_memory_bytes: 0,
            lazy_block_read: false,
            reverse_reader: false,
            query_instant: None,
            requested_schema,
        }
    }

    /// Sets the merge rule.
    #[must_use]
    pub fn merge_mode(mut self, mode: MergeMode) -> Self {
        self.merge_mode = mode;
        self
    }

    /// Sets the precombine (ordering) column. Required for `EVENT_TIME`.
    #[must_use]
    pub fn precombine_field(mut self, field: impl Into<String>) -> Self {
        self.precombine_field = Some(field.into());
        self
    }

    /// Enables position-mode merging (keys by `_row_index` rather than the
    /// record-key column).
    #[must_use]
    pub fn use_row_position(mut self, enabled: bool) -> Self {
        self.use_row_position = enabled;
        self
    }

    /// Sets the buffer memory budget before spilling to disk. `0` disables
    /// the budget (never spills).
    #[must_use]
    pub fn max_memory_bytes(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = bytes;
        self
    }

    /// Defers data-block body decode until a key is actually fetched.
    #[must_use]
    pub fn lazy_block_read(mut self, enabled: bool) -> Self {
        self.lazy_block_read = enabled;
        self
    }

    /// Reserved for a future incremental mode; no-op on snapshot reads.
    #[must_use]
    pub fn reverse_reader(mut self, enabled: bool) -> Self {
        self.reverse_reader = enabled;
        self
    }

    /// Sets the upper-bound visibility cutoff instant.
    #[must_use]
    pub fn query_instant(mut self, instant: impl Into<Instant>) -> Self {
        self.query_instant = Some(instant.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instant::StaticTimeline;
    use crate::schema::{DataType, StructField};
    use crate::storage::MemoryStorage;

    #[test]
    fn builder_defaults_are_conservative() {
        let config = ReaderConfig::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(StaticTimeline::new()),
            Arc::new(CodecRegistry::new()),
            "id",
            Schema::new(vec![StructField::new("id", DataType::String, false)]),
        );

        assert_eq!(config.merge_mode, MergeMode::OverwriteWithLatest);
        assert!(!config.use_row_position);
        assert_eq!(config.max_memory_bytes, 0);
    }

    #[test]
    fn builder_chain_overrides_defaults() {
        let config = ReaderConfig::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(StaticTimeline::new()),
            Arc::new(CodecRegistry::new()),
            "id",
            Schema::new(vec![]),
        )
        .merge_mode(MergeMode::EventTime)
        .precombine_field("ts")
        .use_row_position(true)
        .max_memory_bytes(4096)
        .query_instant("200");

        assert_eq!(config.merge_mode, MergeMode::EventTime);
        assert_eq!(config.precombine_field.as_deref(), Some("ts"));
        assert!(config.use_row_position);
        assert_eq!(config.query_instant, Some(Instant::new("200")));
    }
}
