// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! In-memory keyed record buffer with tombstone-aware folding and spill
//! (§4.3, §4.7).
//!
//! Structurally mirrors the teacher's `Memtable`: a
//! [`crossbeam_skiplist::SkipMap`] keyed map with an atomic running size,
//! except here the "flush" path is a key-granular spill to disk rather than
//! a whole-memtable segment write, since the buffer must stay readable
//! (keys looked up by the merge driver) for the entire slice read.

use crate::coding::Encode;
use crate::error::Result;
use crate::merge_rule::MergeRule;
use crate::record::{LogicalRecord, RecordKey};
use crate::spill::SpillStore;
use crossbeam_skiplist::SkipMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

fn estimate_size(record: &LogicalRecord) -> u64 {
    record.encode_into_vec().len() as u64
}

fn key_bytes(key: &RecordKey) -> Vec<u8> {
    key.encode_into_vec()
}

/// Keyed fold buffer: every log contribution for a key is folded through
/// [`MergeRule::fold`] as it arrives, so at any point in time each key holds
/// exactly the winner of all contributions seen so far.
pub struct RecordBuffer {
    merge_rule: MergeRule,
    resident: SkipMap<RecordKey, LogicalRecord>,
    approx_bytes: AtomicU64,
    max_memory_bytes: u64,
    spill: Option<SpillStore>,
}

impl RecordBuffer {
    /// Creates an empty buffer. Spilling begins once `approx_bytes` exceeds
    /// `max_memory_bytes` (0 disables the budget, i.e. never spills).
    #[must_use]
    pub fn new(merge_rule: MergeRule, max_memory_bytes: u64) -> Self {
        Self {
            merge_rule,
            resident: SkipMap::new(),
            approx_bytes: AtomicU64::new(0),
            max_memory_bytes,
            spill: None,
        }
    }

    /// Folds `incoming` into whatever is currently held for its key
    /// (resident or spilled), writing the winner back to the resident map.
    ///
    /// # Errors
    ///
    /// Returns an [`crate::Error`] if reading back a previously-spilled
    /// value for this key fails.
    pub fn fold(&mut self, incoming: LogicalRecord) -> Result<()> {
        let key = incoming.key().clone();
        let kb = key_bytes(&key);

        let existing = match self.resident.get(&key) {
            Some(entry) => Some(entry.value().clone()),
            None => match self.spill.as_mut() {
                Some(store) => store.get(&kb)?,
                None => None,
            },
        };

        let winner = match existing {
            Some(existing) => self.merge_rule.fold(&existing, &incoming),
            None => incoming,
        };

        self.approx_bytes.fetch_add(estimate_size(&winner), AtomicOrdering::Relaxed);
        self.resident.insert(key, winner);

        if let Some(store) = self.spill.as_mut() {
            store.remove(&kb);
        }

        self.maybe_spill()?;

        Ok(())
    }

    /// `true` if the buffer holds no keys, resident or spilled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resident.is_empty() && self.spill.as_ref().is_none_or(SpillStore::is_empty)
    }

    /// Drains every key's winning [`LogicalRecord`], resident and spilled.
    ///
    /// # Errors
    ///
    /// Returns an [`crate::Error`] if a spilled record cannot be read back.
    pub fn drain(mut self) -> Result<Vec<LogicalRecord>> {
        let mut out: Vec<LogicalRecord> = self.resident.iter().map(|e| e.value().clone()).collect();

        if let Some(mut store) = self.spill.take() {
            let keys: Vec<Vec<u8>> = store.keys().map(<[u8]>::to_vec).collect();
            for kb in keys {
                if let Some(record) = store.get(&kb)? {
                    out.push(record);
                }
            }
        }

        Ok(out)
    }

    /// Looks up the current winner for `key`, resident or spilled.
    ///
    /// # Errors
    ///
    /// Returns an [`crate::Error`] if a spilled record cannot be read back.
    pub fn get(&mut self, key: &RecordKey) -> Result<Option<LogicalRecord>> {
        if let Some(entry) = self.resident.get(key) {
            return Ok(Some(entry.value().clone()));
        }
        match self.spill.as_mut() {
            Some(store) => store.get(&key_bytes(key)),
            None => Ok(None),
        }
    }

    fn maybe_spill(&mut self) -> Result<()> {
        if self.max_memory_bytes == 0 {
            return Ok(());
        }

        while self.approx_bytes.load(AtomicOrdering::Relaxed) > self.max_memory_bytes {
            let Some(entry) = self.resident.front() else {
                break;
            };

            let key = entry.key().clone();
            let record = entry.value().clone();
            let size = estimate_size(&record);
            drop(entry);

            let store = self.spill.get_or_insert_with(|| {
                SpillStore::new(None).expect("temp file creation for spill store")
            });
            store.put(key_bytes(&key), &record)?;
            self.resident.remove(&key);
            self.approx_bytes.fetch_sub(size, AtomicOrdering::Relaxed);
        }

        Ok(())
    }
}
