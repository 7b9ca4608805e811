// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Joins the base-file row stream with the folded record buffer (§4.2, §4.3).
//!
//! [Open question resolution, see `SPEC_FULL.md`]: base-matched rows are
//! emitted first, in base-file order; rows the buffer holds with no base
//! counterpart (pure inserts) are emitted last, in an unspecified order
//! (the buffer is keyed, not sequenced) — invariant 7's "buffer-only rows
//! match as multisets" is exactly this guarantee and no stronger one.

use crate::buffer::RecordBuffer;
use crate::error::Result;
use crate::instant::Instant;
use crate::merge_rule::MergeRule;
use crate::ordering::OrderingValue;
use crate::record::{LogicalRecord, RecordKey, RecordState};
use crate::row::{Row, ScalarValue};
use crate::schema::{Schema, ROW_INDEX_COLUMN};
use crate::slice::Slice;
use rustc_hash::FxHashSet;

/// Extracts the [`RecordKey`] of a row (base-file or decoded log record),
/// per the configured merging mode.
pub(crate) fn row_key(row: &Row, schema: &Schema, record_key_field: &str, use_row_position: bool) -> RecordKey {
    if use_row_position {
        let idx = schema
            .index_of(ROW_INDEX_COLUMN)
            .expect("required_schema carries _row_index in position mode");
        match row.get(idx) {
            Some(ScalarValue::Int64(pos)) => RecordKey::Position(*pos as u64),
            _ => RecordKey::Position(0),
        }
    } else {
        let idx = schema
            .index_of(record_key_field)
            .expect("required_schema carries the record key field");
        let bytes = match row.get(idx) {
            Some(ScalarValue::String(s)) => Slice::from(s.as_ref()),
            Some(ScalarValue::Binary(b)) => b.clone(),
            _ => Slice::empty(),
        };
        RecordKey::Key(bytes)
    }
}

/// Wraps a base-file row as a contribution to its key, carrying its real
/// precombine value when one is declared (so it competes with a log
/// contribution's ordering value on equal footing, per §4.3), or the
/// `(base_instant, 0, row_seq)` fallback tuple otherwise — [`OrderingValue`]
/// ranks `Fallback` below every concrete ordering value, so that fallback
/// still loses to any log contribution carrying one.
fn base_as_logical_record(
    row: &Row,
    schema: &Schema,
    key: RecordKey,
    base_instant: &Instant,
    precombine_field: Option<&str>,
    row_seq: u64,
) -> LogicalRecord {
    let ordering = match precombine_field.and_then(|field| row.get_named(schema, field)) {
        Some(value) => OrderingValue::from_scalar(value),
        None => OrderingValue::Fallback(base_instant.clone(), 0, row_seq),
    };

    LogicalRecord::new(
        key,
        Slice::empty(),
        RecordState::Present(row.clone()),
        ordering,
        base_instant.clone(),
    )
}

/// Merges `base_rows` (already projected to `required_schema`) with
/// `buffer`'s folded log contributions.
///
/// # Errors
///
/// Returns an [`crate::Error`] if reading back a spilled buffer entry fails.
pub fn merge(
    base_rows: Vec<Row>,
    required_schema: &Schema,
    record_key_field: &str,
    precombine_field: Option<&str>,
    use_row_position: bool,
    base_instant: &Instant,
    merge_rule: &MergeRule,
    mut buffer: RecordBuffer,
) -> Result<Vec<Row>> {
    let mut out = Vec::with_capacity(base_rows.len());
    let mut consumed: FxHashSet<RecordKey> = FxHashSet::default();

    for (row_seq, row) in base_rows.into_iter().enumerate() {
        let key = row_key(&row, required_schema, record_key_field, use_row_position);

        match buffer.get(&key)? {
            Some(log_winner) => {
                consumed.insert(key.clone());
                let base_record = base_as_logical_record(
                    &row,
                    required_schema,
                    key,
                    base_instant,
                    precombine_field,
                    row_seq as u64,
                );
                let winner = merge_rule.fold(&base_record, &log_winner);
                if !merge_rule.is_delete(&winner) {
                    if let RecordState::Present(row) = winner.state() {
                        out.push(row.clone());
                    }
                }
            }
            None => out.push(row),
        }
    }

    for record in buffer.drain()? {
        if consumed.contains(record.key()) {
            continue;
        }
        if merge_rule.is_delete(&record) {
            continue;
        }
        if let RecordState::Present(row) = record.state() {
            out.push(row.clone());
        }
    }

    Ok(out)
}
