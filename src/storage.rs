// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Storage collaborator (§6, collaborator 1): bit-exact byte access with no
//! buffering guarantees of its own.

use crate::error::Result;

/// An open handle to a file under [`Storage`].
pub trait ReadHandle: Send + Sync {
    /// The handle's path, for error messages.
    fn path(&self) -> &str;
}

/// Collaborator the reader uses for all I/O. Never touched directly by the
/// merge path; only by [`crate::base_file::BaseFileReader`] and
/// [`crate::log_scanner::LogScanner`].
pub trait Storage: Send + Sync {
    /// Opens `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnderlyingIoError`] on failure.
    fn open(&self, path: &str) -> Result<Box<dyn ReadHandle>>;

    /// Reads exactly `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnderlyingIoError`] on failure, including a
    /// short read past end-of-file.
    fn read_range(&self, handle: &dyn ReadHandle, offset: u64, len: u64) -> Result<Vec<u8>>;

    /// Returns the size in bytes of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnderlyingIoError`] on failure.
    fn stat(&self, path: &str) -> Result<u64>;
}

/// An in-memory [`Storage`] backing test fixtures: files are named byte
/// buffers, never touching the filesystem.
#[derive(Default)]
pub struct MemoryStorage {
    files: rustc_hash::FxHashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    /// Creates an empty in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a file's contents.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.files.insert(path.into(), bytes);
        self
    }
}

struct MemoryHandle(String);

impl ReadHandle for MemoryHandle {
    fn path(&self) -> &str {
        &self.0
    }
}

impl Storage for MemoryStorage {
    fn open(&self, path: &str) -> Result<Box<dyn ReadHandle>> {
        if self.files.contains_key(path) {
            Ok(Box::new(MemoryHandle(path.to_owned())))
        } else {
            Err(crate::Error::UnderlyingIoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {path}"),
            )))
        }
    }

    fn read_range(&self, handle: &dyn ReadHandle, offset: u64, len: u64) -> Result<Vec<u8>> {
        let bytes = self.files.get(handle.path()).ok_or_else(|| {
            crate::Error::UnderlyingIoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", handle.path()),
            ))
        })?;

        let start = offset as usize;
        let end = start + len as usize;

        bytes.get(start..end).map(<[u8]>::to_vec).ok_or_else(|| {
            crate::Error::UnderlyingIoError(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("read past end of {}", handle.path()),
            ))
        })
    }

    fn stat(&self, path: &str) -> Result<u64> {
        self.files
            .get(path)
            .map(|b| b.len() as u64)
            .ok_or_else(|| {
                crate::Error::UnderlyingIoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no such file: {path}"),
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_reads_back_written_bytes() {
        let storage = MemoryStorage::new().with_file("a.log", vec![1, 2, 3, 4]);
        let handle = storage.open("a.log").unwrap();
        let bytes = storage.read_range(handle.as_ref(), 1, 2).unwrap();
        assert_eq!(bytes, vec![2, 3]);
    }

    #[test]
    fn missing_file_is_underlying_io_error() {
        let storage = MemoryStorage::new();
        let err = storage.open("missing.log").unwrap_err();
        assert!(matches!(err, crate::Error::UnderlyingIoError(_)));
    }
}
