//! S5 — a corrupt byte run between two valid blocks is skipped, and the
//! surviving blocks merge identically to a corruption-free log.

mod common;

use common::{append_data_block, codecs_with, row, schema};
use filegroup_reader::{
    ActionType, FileGroupReader, FileSlice, LogFile, MemoryStorage, MergeMode, ReaderConfig,
    ScalarValue, StaticTimeline,
};
use rand::Rng;
use std::sync::Arc;
use test_log::test;

fn read_all(log_bytes: Vec<u8>) -> filegroup_reader::Result<Vec<filegroup_reader::Row>> {
    let storage = MemoryStorage::new().with_file("L0", log_bytes);
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

    let slice = FileSlice::new().with_log_file(LogFile::new("L0", "fg1", "100", 1, "t1"));
    let mut reader = FileGroupReader::new(config, slice, None, None, None);

    let mut rows = Vec::new();
    while let Some(result) = reader.advance() {
        rows.push(result?);
    }
    Ok(rows)
}

fn sort_key(row: &filegroup_reader::Row) -> String {
    match row.get(0) {
        Some(ScalarValue::String(s)) => s.to_string(),
        _ => String::new(),
    }
}

#[test]
fn sixteen_random_garbage_bytes_between_blocks_do_not_change_the_merged_result() -> filegroup_reader::Result<()> {
    let mut clean = Vec::new();
    append_data_block(&mut clean, "101", &[row("id1", 10, 1), row("id2", 20, 1)], 0);
    append_data_block(&mut clean, "102", &[row("id1", 11, 2)], 1);

    let mut corrupted = Vec::new();
    append_data_block(&mut corrupted, "101", &[row("id1", 10, 1), row("id2", 20, 1)], 0);
    let mut rng = rand::rng();
    corrupted.extend((0..16).map(|_| rng.random::<u8>()));
    append_data_block(&mut corrupted, "102", &[row("id1", 11, 2)], 1);

    let mut baseline = read_all(clean)?;
    let mut recovered = read_all(corrupted)?;

    baseline.sort_by_key(sort_key);
    recovered.sort_by_key(sort_key);

    assert_eq!(baseline, recovered);
    assert_eq!(recovered.len(), 2);

    Ok(())
}

#[test]
fn random_garbage_runs_of_varying_length_are_always_skipped() -> filegroup_reader::Result<()> {
    let mut rng = rand::rng();

    for garbage_len in [0usize, 1, 7, 16, 64, 255] {
        let mut clean = Vec::new();
        append_data_block(&mut clean, "101", &[row("id1", 10, 1), row("id2", 20, 1)], 0);
        append_data_block(&mut clean, "102", &[row("id1", 11, 2)], 1);

        let mut corrupted = Vec::new();
        append_data_block(&mut corrupted, "101", &[row("id1", 10, 1), row("id2", 20, 1)], 0);
        corrupted.extend((0..garbage_len).map(|_| rng.random::<u8>()));
        append_data_block(&mut corrupted, "102", &[row("id1", 11, 2)], 1);

        let mut baseline = read_all(clean)?;
        let mut recovered = read_all(corrupted)?;

        baseline.sort_by_key(sort_key);
        recovered.sort_by_key(sort_key);

        assert_eq!(baseline, recovered, "garbage_len={garbage_len}");
    }

    Ok(())
}
