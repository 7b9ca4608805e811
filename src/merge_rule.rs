// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Merge rules and the fold-semantics table of §4.3.

use crate::record::{LogicalRecord, RecordState};

/// Decides how two contributions to the same key fold into one.
///
/// `OverwriteWithLatest` and `EventTime` are both "keep the record with the
/// higher `ordering_value`, breaking ties by `source_instant`" — they differ
/// only in *how* the ordering value was produced upstream (row arrival order
/// vs. a declared precombine column), which is already baked into the
/// `ordering_value` each [`LogicalRecord`] carries by the time it reaches
/// the buffer. `Custom` delegates both the combine and the delete decisions.
pub enum MergeRule {
    /// Last-arrival-wins, where arrival order is `ordering_value`'s fallback
    /// `(instant, block_seq, row_seq)` tuple.
    OverwriteWithLatest,
    /// Highest-precombine-value-wins.
    EventTime,
    /// User-supplied combine/delete logic.
    Custom(Box<dyn Merger>),
}

/// User-pluggable combine logic for `MergeRule::Custom`.
///
/// Implementations must be pure functions of their inputs: no I/O, no
/// hidden state across calls. The buffer may call `combine` in either
/// argument order relative to arrival, so implementations must not assume
/// `incoming` is newer than `existing`.
pub trait Merger: Send + Sync {
    /// Combines two contributions to the same key, returning the winner.
    fn combine(&self, existing: &LogicalRecord, incoming: &LogicalRecord) -> LogicalRecord;

    /// Returns `true` if `record` should be treated as a deletion once it
    /// has won the fold (distinct from `RecordState::Tombstone`, for
    /// mergers that encode "delete" as a sentinel value within a `Present`
    /// row rather than as a dedicated tombstone block).
    fn is_delete(&self, record: &LogicalRecord) -> bool {
        record.is_tombstone()
    }
}

impl MergeRule {
    /// Folds `incoming` into `existing`, returning the winner.
    ///
    /// This is the single fold step of §4.3's table: it is applied
    /// pairwise by the record buffer as log contributions arrive. Three of
    /// the table's four cells (present/present, present/tombstone with
    /// strictly higher ordering, tombstone/tombstone) reduce to "keep the
    /// higher-ordering-value side, tie-broken by later instant", since
    /// `RecordState` is carried through unchanged by the winner. The
    /// remaining cell is the exception the table calls out explicitly: on
    /// *equal* ordering, a tombstone beats a present value regardless of
    /// instant, so a delete is never resurrected by an equal-ordering
    /// upsert written earlier in the same fold.
    #[must_use]
    pub fn fold(&self, existing: &LogicalRecord, incoming: &LogicalRecord) -> LogicalRecord {
        match self {
            Self::OverwriteWithLatest | Self::EventTime => {
                match incoming.ordering_value().cmp(existing.ordering_value()) {
                    std::cmp::Ordering::Greater => incoming.clone(),
                    std::cmp::Ordering::Less => existing.clone(),
                    std::cmp::Ordering::Equal => match (existing.is_tombstone(), incoming.is_tombstone()) {
                        (false, true) => incoming.clone(),
                        (true, false) => existing.clone(),
                        _ if incoming.source_instant() >= existing.source_instant() => incoming.clone(),
                        _ => existing.clone(),
                    },
                }
            }
            Self::Custom(merger) => merger.combine(existing, incoming),
        }
    }

    /// `true` if `record` should suppress emission of its key (after
    /// folding has settled on a winner).
    #[must_use]
    pub fn is_delete(&self, record: &LogicalRecord) -> bool {
        match self {
            Self::OverwriteWithLatest | Self::EventTime => record.is_tombstone(),
            Self::Custom(merger) => merger.is_delete(record),
        }
    }
}
