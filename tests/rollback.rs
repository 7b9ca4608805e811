//! S3 — a rollback command block voids its target instant's data block.

mod common;

use common::{append_data_block, append_rollback_block, codecs_with, row, schema};
use filegroup_reader::{
    ActionType, CodecRegistry, FileGroupReader, FileSlice, LogFile, MemoryStorage, MergeMode,
    ReaderConfig, ScalarValue, StaticTimeline,
};
use std::sync::Arc;
use test_log::test;

#[test]
fn rollback_command_voids_the_targeted_instant() -> filegroup_reader::Result<()> {
    let mut l0 = Vec::new();
    append_data_block(&mut l0, "101", &[row("id1", 10, 1)], 0);
    append_rollback_block(&mut l0, "102", "101");

    let storage = MemoryStorage::new().with_file("L0", l0);
    let timeline = StaticTimeline::new()
        .with_completed("101", ActionType::DeltaCommit)
        .with_completed("102", ActionType::Rollback);
    let codecs: CodecRegistry = codecs_with(vec![(0, vec![row("id1", 10, 1)])]);

    let config = ReaderConfig::new(Arc::new(storage), Arc::new(timeline), Arc::new(codecs), "id", schema())
        .merge_mode(MergeMode::EventTime)
        .precombine_field("ts");

    let slice = FileSlice::new().with_log_file(LogFile::new("L0", "fg1", "100", 1, "t1"));
    let mut reader = FileGroupReader::new(config, slice, None, None, None);

    let mut rows = Vec::new();
    while let Some(result) = reader.advance() {
        rows.push(result?);
    }

    assert!(rows
        .iter()
        .all(|r| r.get(0) != Some(&ScalarValue::String("id1".into()))));
    assert!(rows.is_empty());
    Ok(())
}
