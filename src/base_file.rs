// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Base-file reading collaborator (§4.4).
//!
//! The actual columnar decode (Parquet/Avro/ORC) lives outside this crate;
//! implementors of [`BaseFileReader`] wrap whatever engine-specific reader
//! produces rows, and this module only handles the two things the merge
//! path actually needs from it: `_row_index` injection and schema widening.

use crate::error::{Error, Result};
use crate::row::{Row, ScalarValue};
use crate::schema::{Schema, ROW_INDEX_COLUMN};

/// Reads a base file's rows under its native on-disk schema.
///
/// Implementations must produce rows in file order — the merge driver
/// relies on `_row_index` (when requested) corresponding to that order.
pub trait BaseFileReader: Send + Sync {
    /// The base file's on-disk schema (`data_schema`).
    fn data_schema(&self) -> &Schema;

    /// Reads every row of the base file, in file order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnderlyingIoError`] on I/O failure.
    fn read_rows(&self) -> Result<Vec<Row>>;
}

/// Reads `reader`'s rows, checks `data_schema` widens into `required_schema`,
/// and injects `_row_index` if `required_schema` declares it.
///
/// # Errors
///
/// Returns [`Error::SchemaMismatch`] if `data_schema` does not widen into
/// `required_schema`, otherwise whatever `reader.read_rows()` returns.
pub fn read_required(
    reader: &dyn BaseFileReader,
    required_schema: &Schema,
) -> Result<Vec<Row>> {
    let data_schema = reader.data_schema();

    let without_row_index = Schema::new(
        required_schema
            .fields()
            .iter()
            .filter(|f| &*f.name != ROW_INDEX_COLUMN)
            .cloned()
            .collect(),
    );

    if !without_row_index.is_subset_of(data_schema) {
        return Err(Error::SchemaMismatch {
            column: without_row_index
                .fields()
                .iter()
                .find(|f| {
                    data_schema
                        .field(&f.name)
                        .is_none_or(|g| !f.data_type.is_compatible_with(&g.data_type))
                })
                .map(|f| f.name.to_string())
                .unwrap_or_default(),
            reason: "base file schema does not widen into required_schema".to_owned(),
        });
    }

    let mut rows = reader.read_rows()?;

    if required_schema.field(ROW_INDEX_COLUMN).is_some() {
        for (i, row) in rows.iter_mut().enumerate() {
            let mut values = row.values().to_vec();
            values.push(ScalarValue::Int64(i as i64));
            *row = Row::new(values).project(
                &Schema::new({
                    let mut fields = data_schema.fields().to_vec();
                    fields.push(crate::schema::StructField::new(
                        ROW_INDEX_COLUMN,
                        crate::schema::DataType::Int64,
                        false,
                    ));
                    fields
                }),
                required_schema,
            );
        }
    } else {
        for row in &mut rows {
            *row = row.project(data_schema, required_schema);
        }
    }

    Ok(rows)
}

/// A fixture [`BaseFileReader`] holding rows in memory, for tests.
pub struct InMemoryBaseFileReader {
    schema: Schema,
    rows: Vec<Row>,
}

impl InMemoryBaseFileReader {
    /// Creates a fixture reader over `rows` under `schema`.
    #[must_use]
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }
}

impl BaseFileReader for InMemoryBaseFileReader {
    fn data_schema(&self) -> &Schema {
        &self.schema
    }

    fn read_rows(&self) -> Result<Vec<Row>> {
        Ok(self.rows.clone())
    }
}
