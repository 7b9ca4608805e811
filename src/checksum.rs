// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Block integrity checksum.
//!
//! The wire frame's trailing checksum is optional (§6: `... | footer_map |
//! crc?`); this crate's own writer and reader rely on the magic marker and
//! the `body_len`-bounded read instead (a truncated or bit-flipped frame
//! fails those checks the same way a bad checksum would, and demotes the
//! block to [`crate::error::Error::CorruptBlock`]). [`Checksum`] stays
//! available for embedders whose storage layer wants to verify bytes
//! in-flight (e.g. over a network-backed [`crate::storage::Storage`])
//! independently of frame parsing.

/// A 128-bit checksum over a block's body bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Checksum(u128);

impl Checksum {
    /// Wraps a raw 128-bit integer.
    #[must_use]
    pub fn from_raw(value: u128) -> Self {
        Self(value)
    }

    /// Returns the raw 128-bit integer.
    #[must_use]
    pub fn into_u128(self) -> u128 {
        self.0
    }

    /// Computes the checksum of `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = xxhash_rust::xxh3::Xxh3Default::new();
        hasher.update(bytes);
        Self(hasher.digest128())
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
