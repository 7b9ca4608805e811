// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The timeline instant and its oracle collaborator.
//!
//! The reader never maintains timeline state itself (§1 "OUT OF SCOPE:
//! ... timeline service"); it only asks a [`TimelineOracle`] whether a given
//! instant is visible.

use crate::coding::{Decode, Encode};
use crate::slice::Slice;

/// A monotonically ordered identifier of a write to the table.
///
/// Instants compare lexicographically (byte order), which Hudi's timestamp
/// format (`yyyyMMddHHmmssSSS`) is designed to agree with.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Instant(Slice);

impl Instant {
    /// Wraps a raw instant string.
    #[must_use]
    pub fn new(s: impl Into<Slice>) -> Self {
        Self(s.into())
    }

    /// Returns the instant as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the instant as a `&str`, if it is valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("<non-utf8 instant>")
    }
}

impl std::fmt::Debug for Instant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instant({})", self.as_str())
    }
}

impl PartialOrd for Instant {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Instant {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T: Into<Slice>> From<T> for Instant {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl crate::coding::Encode for Instant {
    fn encode_into<W: std::io::Write>(&self, writer: &mut W) -> Result<(), crate::coding::EncodeError> {
        self.0.encode_into(writer)
    }
}

impl crate::coding::Decode for Instant {
    fn decode_from<R: std::io::Read>(reader: &mut R) -> Result<Self, crate::coding::DecodeError> {
        Ok(Self(Slice::decode_from(reader)?))
    }
}

/// The action a completed instant represents, as reported by the timeline.
///
/// Only relevant to the reader insofar as a `ROLLBACK` action on the
/// timeline and a `ROLLBACK` command block in a log file are different
/// things: the timeline action records that a rollback transaction
/// happened; the command block is how the reader learns, in-band, which
/// prior blocks it invalidates (see [`crate::block::CommandSubtype`]).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ActionType {
    /// A base-file write (compaction-free MOR write path writes log files
    /// under `DeltaCommit`; `Commit` is used by copy-on-write tables).
    Commit,
    /// A Merge-on-Read delta write: new log blocks appended to a slice.
    DeltaCommit,
    /// A rewrite of file groups (e.g. clustering).
    Replace,
    /// A clustering operation, a specialization of `Replace`.
    Clustering,
    /// A rollback of a prior instant.
    Rollback,
    /// A cleaning operation that removed old file slices.
    Clean,
    /// A compaction that folded log files into a new base file.
    Compaction,
}

/// Collaborator interface (§6) the reader uses to decide whether a block's
/// `INSTANT_TIME` is visible to the current snapshot query.
///
/// The reader never inspects the timeline directly; it treats this trait as
/// an opaque read-only oracle, which keeps the reader decoupled from commit
/// protocol, metastore sync, or any multi-writer coordination concern.
pub trait TimelineOracle {
    /// Returns `true` if `instant` has reached the `COMPLETED` state.
    fn is_completed(&self, instant: &Instant) -> bool;

    /// Returns `true` if `instant <= cutoff` under timeline instant order.
    ///
    /// This is almost always just `instant <= cutoff`, but is exposed as its
    /// own method because some timelines (e.g. ones using non-monotonic
    /// clustering replace-commits) may need a different comparison.
    fn le_cutoff(&self, instant: &Instant, cutoff: &Instant) -> bool {
        instant <= cutoff
    }

    /// Returns the action type of `instant`, if known.
    fn action_of(&self, instant: &Instant) -> Option<ActionType>;
}

/// An in-memory [`TimelineOracle`] for tests and small embeddings: every
/// instant it is told about is completed, compared purely by instant order.
#[derive(Default)]
pub struct StaticTimeline {
    completed: rustc_hash::FxHashMap<Instant, ActionType>,
}

impl StaticTimeline {
    /// Creates an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `instant` as completed with the given action.
    #[must_use]
    pub fn with_completed(mut self, instant: impl Into<Instant>, action: ActionType) -> Self {
        self.completed.insert(instant.into(), action);
        self
    }
}

impl TimelineOracle for StaticTimeline {
    fn is_completed(&self, instant: &Instant) -> bool {
        self.completed.contains_key(instant)
    }

    fn action_of(&self, instant: &Instant) -> Option<ActionType> {
        self.completed.get(instant).copied()
    }
}
