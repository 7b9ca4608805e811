//! S1 — log-only upsert across two log files, `EVENT_TIME` merge.

mod common;

use common::{append_data_block, codecs_with, row, schema};
use filegroup_reader::{
    ActionType, FileGroupReader, FileSlice, LogFile, MemoryStorage, MergeMode, ReaderConfig,
    ScalarValue, StaticTimeline,
};
use std::sync::Arc;
use test_log::test;

#[test]
fn log_only_upsert_merges_event_time_across_log_files() -> filegroup_reader::Result<()> {
    let mut l0 = Vec::new();
    append_data_block(&mut l0, "101", &[row("id1", 10, 1), row("id2", 20, 1)], 0);
    let mut l1 = Vec::new();
    append_data_block(&mut l1, "102", &[row("id1", 11, 2)], 1);

    let storage = MemoryStorage::new().with_file("L0", l0).with_file("L1", l1);
    let timeline = StaticTimeline::new()
        .with_completed("101", ActionType::DeltaCommit)
        .with_completed("102", ActionType::DeltaCommit);
    let codecs = codecs_with(vec![
        (0, vec![row("id1", 10, 1), row("id2", 20, 1)]),
        (1, vec![row("id1", 11, 2)]),
    ]);

    let config = ReaderConfig::new(Arc::new(storage), Arc::new(timeline), Arc::new(codecs), "id", schema())
        .merge_mode(MergeMode::EventTime)
        .precombine_field("ts");

    let slice = FileSlice::new()
        .with_log_file(LogFile::new("L0", "fg1", "100", 1, "t1"))
        .with_log_file(LogFile::new("L1", "fg1", "100", 2, "t2"));

    let mut reader = FileGroupReader::new(config, slice, None, None, None);

    let mut rows = Vec::new();
    while let Some(result) = reader.advance() {
        rows.push(result?);
    }

    assert_eq!(rows.len(), 2);

    let id1 = rows
        .iter()
        .find(|r| r.get(0) == Some(&ScalarValue::String("id1".into())))
        .expect("id1 survives the merge");
    assert_eq!(id1.get(1), Some(&ScalarValue::Int64(11)));
    assert_eq!(id1.get(2), Some(&ScalarValue::Int64(2)));

    let id2 = rows
        .iter()
        .find(|r| r.get(0) == Some(&ScalarValue::String("id2".into())))
        .expect("id2 survives the merge");
    assert_eq!(id2.get(1), Some(&ScalarValue::Int64(20)));

    Ok(())
}
