// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! File-group data model (§3).

use crate::instant::Instant;

/// A base (columnar) file written at a specific instant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BaseFile {
    /// Storage path.
    pub path: String,
    /// Instant the base file was written at.
    pub base_instant: Instant,
}

impl BaseFile {
    /// Creates a new base file reference.
    #[must_use]
    pub fn new(path: impl Into<String>, base_instant: impl Into<Instant>) -> Self {
        Self {
            path: path.into(),
            base_instant: base_instant.into(),
        }
    }
}

/// An append-only log file belonging to one file slice.
///
/// Invariant (§3): `base_instant` must equal the enclosing [`FileSlice`]'s
/// base instant; log files are uniquely identified by
/// `(file_id, base_instant, version, write_token)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogFile {
    /// Storage path.
    pub path: String,
    /// File-group identifier this log file belongs to.
    pub file_id: String,
    /// Instant of the file slice's base.
    pub base_instant: Instant,
    /// Monotonically increasing version among log files of the same slice.
    pub version: u32,
    /// Writer-assigned token disambiguating concurrent writers.
    pub write_token: String,
}

impl LogFile {
    /// Creates a new log file reference.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        file_id: impl Into<String>,
        base_instant: impl Into<Instant>,
        version: u32,
        write_token: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            file_id: file_id.into(),
            base_instant: base_instant.into(),
            version,
            write_token: write_token.into(),
        }
    }
}

/// A snapshot of one file group at a base instant: an optional base file
/// plus its ordered log files.
#[derive(Clone, Debug, Default)]
pub struct FileSlice {
    /// Base file, absent for a log-only (pure upsert) slice.
    pub base_file: Option<BaseFile>,
    /// Log files, in no particular storage order — the log scanner imposes
    /// `(instant_time, version, offset)` order itself.
    pub log_files: Vec<LogFile>,
}

impl FileSlice {
    /// Creates an empty file slice.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base file.
    #[must_use]
    pub fn with_base_file(mut self, base_file: BaseFile) -> Self {
        self.base_file = Some(base_file);
        self
    }

    /// Appends a log file.
    #[must_use]
    pub fn with_log_file(mut self, log_file: LogFile) -> Self {
        self.log_files.push(log_file);
        self
    }

    /// `true` if this slice has no base file (pure log-only upsert slice).
    #[must_use]
    pub fn is_log_only(&self) -> bool {
        self.base_file.is_none()
    }
}
