use filegroup_reader::coding::Encode;
use filegroup_reader::{
    BlockBodyCodec, CodecRegistry, CodecTag, DataBlockBody, DataType, DeleteBlockBody,
    DeleteEntry, HeaderKey, HeaderMap, LogBlock, OrderingValue, Row, ScalarValue, Schema,
    Slice, StructField,
};

/// `(id, v, ts)` schema used across every scenario test.
#[must_use]
pub fn schema() -> Schema {
    Schema::new(vec![
        StructField::new("id", DataType::String, false),
        StructField::new("v", DataType::Int64, false),
        StructField::new("ts", DataType::Int64, false),
    ])
}

#[must_use]
pub fn row(id: &str, v: i64, ts: i64) -> Row {
    Row::new(vec![
        ScalarValue::String(id.into()),
        ScalarValue::Int64(v),
        ScalarValue::Int64(ts),
    ])
}

/// A codec that ignores its input bytes and always returns the rows it was
/// built with — stands in for a real Avro/Parquet decoder so these tests
/// exercise the scanner/buffer/merge pipeline without a columnar dependency.
pub struct FixedRowsCodec(pub Vec<Row>);

impl BlockBodyCodec for FixedRowsCodec {
    fn decode(&self, _bytes: &[u8], _schema: &Schema) -> filegroup_reader::Result<Vec<Row>> {
        Ok(self.0.clone())
    }
}

/// Registers `rows` under `tag`, to be returned verbatim by the scanner's
/// codec dispatch regardless of the (empty) bytes written into the block.
#[must_use]
pub fn codecs_with(tagged: Vec<(u32, Vec<Row>)>) -> CodecRegistry {
    tagged.into_iter().fold(CodecRegistry::new(), |registry, (tag, rows)| {
        registry.with_codec(CodecTag(tag), Box::new(FixedRowsCodec(rows)))
    })
}

/// Appends a data block at `instant` under `codec_tag` to `buf`. `rows` only
/// determines `record_count`; the codec registered for `codec_tag` supplies
/// the actual decoded rows (see [`FixedRowsCodec`]).
pub fn append_data_block(buf: &mut Vec<u8>, instant: &str, rows: &[Row], codec_tag: u32) {
    let block = LogBlock::Data {
        header: HeaderMap::new().with(HeaderKey::InstantTime, instant.as_bytes().to_vec()),
        body: DataBlockBody {
            codec_tag,
            key_field: Slice::from("id"),
            compression: 0,
            record_count: rows.len() as u64,
            records: Slice::empty(),
        },
        footer: HeaderMap::new(),
    };
    filegroup_reader::block::frame::write_block(buf, &block).expect("write_block cannot fail on a Vec");
}

/// Appends a `COMMAND(ROLLBACK, target)` block at `instant`.
pub fn append_rollback_block(buf: &mut Vec<u8>, instant: &str, target: &str) {
    let header = HeaderMap::new()
        .with(HeaderKey::InstantTime, instant.as_bytes().to_vec())
        .with(HeaderKey::TargetInstantTime, target.as_bytes().to_vec())
        .with(HeaderKey::CommandBlockType, b"ROLLBACK".to_vec());
    let block = LogBlock::Command {
        header,
        subtype: filegroup_reader::CommandSubtype::Rollback,
        footer: HeaderMap::new(),
    };
    filegroup_reader::block::frame::write_block(buf, &block).expect("write_block cannot fail on a Vec");
}

/// Appends a delete block at `instant` deleting `key` with an integer
/// ordering value of `ordering`.
pub fn append_delete_block(buf: &mut Vec<u8>, instant: &str, key: &str, ordering: i64) {
    let encoded = OrderingValue::Integer(ordering).encode_into_vec();
    let block = LogBlock::Delete {
        header: HeaderMap::new().with(HeaderKey::InstantTime, instant.as_bytes().to_vec()),
        body: DeleteBlockBody {
            entries: vec![DeleteEntry {
                key: Slice::from(key),
                partition: Slice::empty(),
                ordering_wrapper_tag: u32::from(encoded[0]),
                ordering_bytes: encoded[1..].to_vec().into(),
            }],
        },
        footer: HeaderMap::new(),
    };
    filegroup_reader::block::frame::write_block(buf, &block).expect("write_block cannot fail on a Vec");
}
